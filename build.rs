fn main() {
    // Host-target test builds skip the ESP-IDF sysenv plumbing.
    if std::env::var("CARGO_FEATURE_ESPIDF").is_ok() {
        embuild::espidf::sysenv::output();
    }
}
