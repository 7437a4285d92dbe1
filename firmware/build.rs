fn main() {
    println!("cargo:rerun-if-env-changed=PETFEEDER_CONFIG");
    println!("cargo:rerun-if-env-changed=PETFEEDER_WIFI_SSID");
    println!("cargo:rerun-if-env-changed=PETFEEDER_WIFI_PASS");

    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
