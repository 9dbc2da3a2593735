#[allow(unused)]
mod state;

#[allow(unused)]
pub use mock_server::*;
#[allow(unused)]
pub use state::*;
#[allow(unused)]
pub use stubs::*;

/// Macro to create the test actix-web service from an AppState.
/// Usage: `let app = test_service!(state);`
macro_rules! test_service {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(interface_actions::handlers::configure_routes),
        )
        .await
    };
}
