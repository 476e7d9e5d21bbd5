use std::fs;

use panacea::commands::run_split;

use crate::support::Workspace;

#[tokio::test]
async fn given_large_file_when_run_split_then_numbered_parts_reassemble_the_input() {
    let workspace = Workspace::new("split");
    let body: String = (0..40)
        .map(|index| format!("User: line number {index:02}\n"))
        .collect();
    let input = workspace.write("panacea_big.txt", &body);
    let ctx = workspace.context();

    let parts = run_split(&ctx, &input, Some(100), None)
        .await
        .expect("split should succeed");

    assert!(parts.len() > 1);
    assert_eq!(
        parts[0].file_name().and_then(|name| name.to_str()),
        Some("panacea_big_part001.txt")
    );
    assert!(parts.iter().all(|part| part.parent() == Some(workspace.root.as_path())));

    let mut reassembled = String::new();
    for part in &parts {
        let content = fs::read_to_string(part).expect("part should be readable");
        assert!(content.len() <= 100);
        assert!(content.ends_with('\n'), "parts end on line boundaries");
        reassembled.push_str(&content);
    }
    assert_eq!(reassembled, body);
}

#[tokio::test]
async fn given_out_dir_and_config_limit_when_run_split_then_parts_land_in_out_dir() {
    let workspace = Workspace::new("split-out");
    let input = workspace.write("notes.txt", "aaaa\nbbbb\ncccc\n");
    let mut config = workspace.config();
    config.split.max_bytes = 5;
    let ctx = workspace.context_with(config);
    let out_dir = workspace.root.join("parts");

    let parts = run_split(&ctx, &input, None, Some(&out_dir))
        .await
        .expect("split should succeed");

    assert_eq!(parts.len(), 3);
    assert_eq!(parts[2], out_dir.join("notes_part003.txt"));
    assert_eq!(fs::read_to_string(&parts[1]).expect("part"), "bbbb\n");
}

#[tokio::test]
async fn given_zero_limit_when_run_split_then_it_is_rejected() {
    let workspace = Workspace::new("split-zero");
    let input = workspace.write("notes.txt", "abc\n");

    let err = run_split(&workspace.context(), &input, Some(0), None)
        .await
        .expect_err("zero limit must fail");
    assert!(err.to_string().contains("max_bytes"));
}

#[tokio::test]
async fn given_latin1_file_when_run_split_then_parts_reassemble_byte_for_byte() {
    let workspace = Workspace::new("split-latin1");
    let body: Vec<u8> = b"User: caf\xe9 cr\xe8me\n".repeat(10);
    let input = workspace.write_bytes("panacea_latin1.txt", &body);

    let parts = run_split(&workspace.context(), &input, Some(40), None)
        .await
        .expect("split should succeed");

    let mut reassembled = Vec::new();
    for part in &parts {
        let content = fs::read(part).expect("part should be readable");
        assert!(content.len() <= 40, "part {} is {} bytes", part.display(), content.len());
        reassembled.extend_from_slice(&content);
    }
    assert_eq!(reassembled.len(), body.len());
    assert_eq!(reassembled, body);
}
