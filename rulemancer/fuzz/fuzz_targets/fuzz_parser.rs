#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemancer::Environment;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut env = Environment::new();
        if env.load_str(s, "fuzz.clp").is_ok() && env.reset().is_ok() {
            let _ = env.run(Some(100));
        }
    }
});
