#[rocket::launch]
fn rocket() -> _ {
    let rocket = expense_auth::rocket();
    log::info!("starting expense auth service");
    rocket
}
