#[rocket::launch]
fn rocket() -> _ {
    clinic_api::rocket()
}
