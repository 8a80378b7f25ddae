use quote::*;
use syn::spanned::Spanned;

use crate::attr::attr_util;

pub struct Field {
    pub field_idx: usize,
    pub field_name: syn::LitStr,
    pub method_ident: syn::Ident,
    pub key: bool,
    pub docs: Vec<syn::Attribute>,
    pub ty: syn::Type,
}

impl Field {
    pub fn try_from(field_idx: usize, method: syn::TraitItemMethod) -> syn::Result<Self> {
        let span = method.span();

        if let Some(default) = &method.default {
            return Err(syn::Error::new(default.span(), "Expected `;`, not a body"));
        }

        if let Some(input) = method.sig.inputs.first() {
            return Err(syn::Error::new(
                input.span(),
                "A field declaration takes no arguments",
            ));
        }

        let mut key = false;
        let mut docs = Vec::new();
        for attr in method.attrs {
            if attr_util::attr_has_simple_ident(&attr, "key") {
                if !attr.tokens.is_empty() {
                    return Err(syn::Error::new(attr.tokens.span(), "Expected bare #[key]"));
                }
                key = true;
            } else if attr_util::attr_has_simple_ident(&attr, "doc") {
                docs.push(attr);
            } else {
                return Err(syn::Error::new(attr.path.span(), "Unrecognized attribute"));
            }
        }

        let ty = match method.sig.output {
            syn::ReturnType::Default => return Err(syn::Error::new(span, "Expected return type")),
            syn::ReturnType::Type(_, ty) => *ty,
        };

        if let syn::Type::Path(path) = &ty {
            if path.qself.is_none() && path.path.is_ident("Self") {
                return Err(syn::Error::new(path.span(), "Expected a type, not Self"));
            }
        }

        let field_name = syn::LitStr::new(&method.sig.ident.to_string(), method.sig.ident.span());

        Ok(Field {
            field_idx,
            field_name,
            method_ident: method.sig.ident,
            key,
            docs,
            ty,
        })
    }
}

pub fn gen_descriptor(
    field: &Field,
    storage_name: &syn::LitStr,
    implicit_key: bool,
) -> proc_macro2::TokenStream {
    let field_name = &field.field_name;
    let ty = &field.ty;
    let key = field.key || (implicit_key && field.field_name.value() == "id");
    let span = ty.span();

    quote_spanned! {span=>
        ::arfind::schema::FieldDescriptor::new(
            #storage_name,
            #field_name,
            <#ty as ::arfind::value::FromValue>::KIND,
            <#ty as ::arfind::value::FromValue>::NULLABLE,
            #key,
        )
    }
}

pub fn gen_accessor(field: &Field, model_path: &syn::Path) -> proc_macro2::TokenStream {
    let method_ident = &field.method_ident;
    let docs = &field.docs;
    let ty = &field.ty;
    let field_idx = field.field_idx;

    quote! {
        #(#docs)*
        pub fn #method_ident() -> ::arfind::field::Field<#model_path, #ty> {
            ::arfind::field::Field::new(
                &<#model_path as ::arfind::schema::Model>::fields()[#field_idx]
            )
        }
    }
}
