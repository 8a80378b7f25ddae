use quote::quote;
use syn::parse::ParseStream;

use crate::field;

pub struct ImplModel {
    pub span: proc_macro2::Span,
    pub path: syn::Path,
    pub field_results: Vec<syn::Result<field::Field>>,
}

impl syn::parse::Parse for ImplModel {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let span = input.span();
        let _: syn::token::Impl = input.parse()?;
        let path: syn::Path = input.parse()?;

        let content;
        let _brace_token = syn::braced!(content in input);

        let mut field_results = Vec::new();
        while !content.is_empty() {
            field_results.push(
                content
                    .parse::<syn::TraitItemMethod>()
                    .and_then(|method| field::Field::try_from(field_results.len(), method)),
            );
        }

        Ok(ImplModel {
            span,
            path,
            field_results,
        })
    }
}

pub fn gen_model(storage_name: syn::LitStr, impl_model: ImplModel) -> proc_macro2::TokenStream {
    let path = &impl_model.path;

    let mut fields = Vec::new();
    let mut errors = Vec::new();
    for result in impl_model.field_results {
        match result {
            Ok(field) => fields.push(field),
            Err(error) => errors.push(error.to_compile_error()),
        }
    }

    if fields.is_empty() && errors.is_empty() {
        errors.push(
            syn::Error::new(impl_model.span, "Expected at least one field").to_compile_error(),
        );
    }

    for (index, field) in fields.iter().enumerate() {
        if fields[..index]
            .iter()
            .any(|other| other.field_name.value() == field.field_name.value())
        {
            errors.push(
                syn::Error::new(field.method_ident.span(), "Duplicate field").to_compile_error(),
            );
        }
    }

    if !errors.is_empty() {
        return quote! { #(#errors)* };
    }

    let implicit_key = !fields.iter().any(|field| field.key);

    let field_count = fields.len();
    let descriptors = fields
        .iter()
        .map(|field| field::gen_descriptor(field, &storage_name, implicit_key));
    let accessors = fields.iter().map(|field| field::gen_accessor(field, path));

    quote! {
        impl ::arfind::schema::Model for #path {
            fn storage_name() -> &'static str {
                #storage_name
            }

            fn fields() -> &'static [::arfind::schema::FieldDescriptor] {
                static FIELDS: [::arfind::schema::FieldDescriptor; #field_count] = [
                    #(#descriptors),*
                ];
                &FIELDS
            }
        }

        impl #path {
            #(#accessors)*
        }
    }
}
