fn main() {
    // ESP-IDF environment is only needed for the device image; host builds
    // (tests, simulation) skip it entirely.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
