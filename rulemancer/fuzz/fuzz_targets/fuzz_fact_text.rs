#![no_main]

use libfuzzer_sys::fuzz_target;
use rulemancer::Environment;

fuzz_target!(|data: &[u8]| {
    if let Ok(s) = std::str::from_utf8(data) {
        let mut env = Environment::new();
        let _ = env.load_str("(deftemplate cell (slot pos) (multislot marks))", "fuzz.clp");
        if env.assert_string(s).is_ok() {
            let _ = env.dump_facts();
        }
    }
});
