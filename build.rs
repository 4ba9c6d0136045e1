fn main() {
    // Only the device build links against ESP-IDF; host tests build with
    // `--no-default-features` and skip the sysenv export.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
