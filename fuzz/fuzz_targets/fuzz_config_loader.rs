#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Malformed TOML and out-of-range values must be rejected, never panic.
    if let Ok(cfg) = hydro_config::load_toml(data) {
        let _ = cfg.validate();
        let _ = cfg.ec.window_len_secs();
    }
});
