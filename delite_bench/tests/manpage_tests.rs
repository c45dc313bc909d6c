use std::path::{Path, PathBuf};

static EXPECTED_SUBCOMMANDS: &[&str] = &["run", "report", "list", "inline"];

fn workspace_root() -> PathBuf {
    // Mirrors the path calculation of the build script.
    Path::new(env!("OUT_DIR")).join("../../../../../")
}

#[test]
fn test_manpage_generation() {
    let man_dir = workspace_root().join("man").join("man1");

    let main_page = man_dir.join("delite-bench.1");
    assert!(main_page.exists(), "Missing manpage: {}", main_page.display());

    for subcommand in EXPECTED_SUBCOMMANDS {
        let page = man_dir.join(format!("delite-bench-{subcommand}.1"));
        assert!(page.exists(), "Missing manpage: {}", page.display());
        let content = std::fs::read_to_string(&page).unwrap();
        assert!(!content.trim().is_empty(), "Manpage {} is empty", page.display());
    }
}

#[test]
fn test_markdown_documents_all_subcommands() {
    let markdown_path = workspace_root().join("docs").join("manpage.md");
    let content = std::fs::read_to_string(&markdown_path).unwrap_or_else(|_| {
        panic!(
            "Failed to read markdown documentation: {}",
            markdown_path.display()
        )
    });

    for subcommand in EXPECTED_SUBCOMMANDS {
        let reference = format!("delite-bench {subcommand}");
        assert!(
            content.contains(&reference),
            "Markdown documentation does not mention: {}",
            reference
        );
    }

    for option in ["--skip-execution", "--app-comparison", "--warmup", "--input"] {
        assert!(
            content.contains(option),
            "Markdown documentation does not mention option: {}",
            option
        );
    }
}
