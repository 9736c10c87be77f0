// CLASSIFICATION: COMMUNITY
// Filename: build.rs v0.6
// Author: Lukas Bower
// Date Modified: 2026-10-16

// Bakes the boot target identity into the binary. Override at build time:
//
//   KEXBOOT_DISK_UUID=... KEXBOOT_PART_UUID=... KEXBOOT_PART_LABEL=... cargo build

const IDENTITY: [(&str, &str); 3] = [
    ("KEXBOOT_DISK_UUID", "e6bb521c-a495-4d06-ab6a-d94b1c07bdc9"),
    ("KEXBOOT_PART_UUID", "ec02ad2a-caeb-44de-9fc7-1b4b5358faf2"),
    ("KEXBOOT_PART_LABEL", "nvme"),
];

fn main() {
    use std::env;

    for (key, fallback) in IDENTITY {
        println!("cargo:rerun-if-env-changed={key}");
        let value = env::var(key).unwrap_or_else(|_| fallback.to_string());
        if key != "KEXBOOT_PART_LABEL" && !looks_like_guid(&value) {
            panic!("{key}={value} is not a GUID (expected 8-4-4-4-12 hex digits)");
        }
        println!("cargo:rustc-env={key}={value}");
    }
}

fn looks_like_guid(s: &str) -> bool {
    let groups: Vec<&str> = s.split('-').collect();
    groups.len() == 5
        && groups
            .iter()
            .zip([8, 4, 4, 4, 12])
            .all(|(g, len)| g.len() == len && g.chars().all(|c| c.is_ascii_hexdigit()))
}
