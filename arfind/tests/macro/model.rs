use arfind::schema::Model;

pub struct GreenSmoothie;
pub struct Pairing;

#[arfind::model("green_smoothies")]
impl GreenSmoothie {
    /// Primary key.
    fn id() -> i64;
    fn name() -> String;
    fn customer_id() -> Option<i64>;
    fn price() -> f64;
    fn organic() -> bool;
    fn photo() -> Option<Vec<u8>>;
}

#[arfind::model("pairings")]
impl Pairing {
    #[key]
    fn smoothie_id() -> i64;
    #[key]
    fn snack() -> String;
    fn rating() -> Option<i32>;
}

fn main() {
    let name: arfind::field::Field<GreenSmoothie, String> = GreenSmoothie::name();
    assert_eq!(name.name(), "name");
    assert_eq!(GreenSmoothie::storage_name(), "green_smoothies");
    assert_eq!(GreenSmoothie::key_indices(), vec![0]);
    assert!(GreenSmoothie::customer_id().descriptor().nullable);

    assert_eq!(Pairing::key_indices(), vec![0, 1]);
    assert_eq!(Pairing::rating().descriptor().model, "pairings");
}
