//! Property-based tests for sandboxed tar extraction: no member whose path
//! is absolute or contains a `..` segment may ever land outside the
//! destination directory.

use fleetmodeld::core::archive::extract_sandboxed;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Member {
    Safe(String),
    Unsafe(String),
}

fn arb_safe_name() -> impl Strategy<Value = String> {
    "[a-zA-Z][a-zA-Z0-9_]{0,20}(/[a-zA-Z][a-zA-Z0-9_]{0,20}){0,2}"
}

fn arb_unsafe_name() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-zA-Z][a-zA-Z0-9_]{0,20}".prop_map(|s| format!("/{s}")),
        "[a-zA-Z][a-zA-Z0-9_]{0,20}".prop_map(|s| format!("../{s}")),
        "[a-zA-Z][a-zA-Z0-9_]{0,20}".prop_map(|s| format!("nested/../../{s}")),
    ]
}

fn arb_member() -> impl Strategy<Value = Member> {
    prop_oneof![
        arb_safe_name().prop_map(Member::Safe),
        arb_unsafe_name().prop_map(Member::Unsafe),
    ]
}

fn build_tar_gz(members: &[Member]) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let encoder = flate2::write::GzEncoder::new(&mut buf, flate2::Compression::fast());
        let mut builder = tar::Builder::new(encoder);
        for (i, member) in members.iter().enumerate() {
            let name = match member {
                Member::Safe(n) => n.clone(),
                Member::Unsafe(n) => n.clone(),
            };
            let content = format!("payload-{i}");
            let mut header = tar::Header::new_gnu();
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, content.as_bytes()).unwrap();
        }
        builder.into_inner().unwrap().finish().unwrap();
    }
    buf
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 75,
        ..ProptestConfig::default()
    })]

    #[test]
    fn extracted_count_equals_safe_member_count_and_nothing_escapes(
        members in prop::collection::vec(arb_member(), 0..12)
    ) {
        let dir = tempfile::tempdir().unwrap();
        let archive_path = dir.path().join("model.tar.gz");
        std::fs::write(&archive_path, build_tar_gz(&members)).unwrap();

        let dest = dir.path().join("untared_model");
        std::fs::create_dir_all(&dest).unwrap();

        let extracted = extract_sandboxed(&archive_path, &dest).unwrap();
        let safe_count = members.iter().filter(|m| matches!(m, Member::Safe(_))).count();
        prop_assert_eq!(extracted, safe_count);

        // Nothing landed outside dest: every file under dir minus the
        // archive itself and dest's own tree must not exist.
        let escaped = walk_unexpected_files(dir.path(), &dest, &archive_path);
        prop_assert!(escaped.is_empty(), "unsafe members escaped: {:?}", escaped);
    }
}

fn walk_unexpected_files(
    root: &std::path::Path,
    dest: &std::path::Path,
    archive_path: &std::path::Path,
) -> Vec<std::path::PathBuf> {
    let mut found = Vec::new();
    for entry in walkdir(root) {
        if entry.starts_with(dest) || entry == archive_path {
            continue;
        }
        if entry.is_file() {
            found.push(entry);
        }
    }
    found
}

fn walkdir(root: &std::path::Path) -> Vec<std::path::PathBuf> {
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        let Ok(read_dir) = std::fs::read_dir(&dir) else { continue };
        for entry in read_dir.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else {
                out.push(path);
            }
        }
    }
    out
}
