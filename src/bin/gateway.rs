#[rocket::launch]
fn rocket() -> _ {
    let rocket = expense_auth::gateway_rocket();
    log::info!("starting expense gateway");
    rocket
}
