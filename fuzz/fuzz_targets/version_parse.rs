#![no_main]

use libfuzzer_sys::fuzz_target;
use rules::BinaryVersion;

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);
    if let Ok(version) = text.parse::<BinaryVersion>() {
        // A parsed version must survive a display round trip.
        let rendered = version.to_string();
        let reparsed: BinaryVersion = rendered.parse().expect("display output reparses");
        assert_eq!(version, reparsed);
    }
});
