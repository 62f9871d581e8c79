#![no_main]

use libfuzzer_sys::fuzz_target;
use writable::{parse_accesschk_output, PrincipalFilter};

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    let filter = PrincipalFilter::new(&["CORP\\Server Admins".to_string()], false);
    let _ = parse_accesschk_output(&text, &filter);
});
