use hdwallet_keykeeper::fairings::{PanicCatcher, RequestLogger};
use rocket::fairing::Fairing;

#[test]
fn test_request_logger_info() {
    let logger = RequestLogger;
    let info = logger.info();

    assert_eq!(info.name, "Request/Response Logger");
    // Kind has no equality, only check it exists
    let _kind = info.kind;
}

#[test]
fn test_panic_catcher_info() {
    let catcher = PanicCatcher;
    let info = catcher.info();

    assert_eq!(info.name, "Panic Catcher");
    let _kind = info.kind;
}

#[test]
fn test_fairing_names_differ() {
    assert_ne!(RequestLogger.info().name, PanicCatcher.info().name);
}

#[test]
fn test_fairing_trait_implementation() {
    fn check_fairing<T: Fairing>(_fairing: T) {}

    check_fairing(RequestLogger);
    check_fairing(PanicCatcher);
}
