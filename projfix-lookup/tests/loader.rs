//! Building, persisting and reloading the reference lookup against real directory trees.

use camino::{Utf8Path, Utf8PathBuf};
use pretty_assertions::assert_eq;
use projfix_lookup::{LookupError, LookupStore, RemapRule};
use std::fs;
use tempfile::TempDir;

fn repo_root(temp: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).expect("utf8 tempdir")
}

fn create_project(root: &Utf8Path, rel: &str, references: &[(&str, &str)]) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let mut xml = String::from(
        "<Project xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n  <ItemGroup>\n",
    );
    for (include, hint) in references {
        xml.push_str(&format!(
            "    <Reference Include=\"{include}\">\n      <HintPath>{hint}</HintPath>\n    </Reference>\n"
        ));
    }
    xml.push_str("  </ItemGroup>\n</Project>\n");
    fs::write(path, xml).unwrap();
}

#[test]
fn empty_tree_gives_empty_store() {
    let temp = tempfile::tempdir().unwrap();
    let store = LookupStore::aggregate(&repo_root(&temp)).unwrap();
    assert!(store.is_empty());
}

#[test]
fn aggregate_merges_all_projects() {
    let temp = tempfile::tempdir().unwrap();
    let root = repo_root(&temp);
    create_project(&root, "src/App/App.csproj", &[("Foo", r"..\lib\Foo.dll")]);
    create_project(
        &root,
        "src/Core/Core.csproj",
        &[("Bar, Version=2.0.0.0", r"..\packages\Bar.2.0\lib\net45\Bar.dll")],
    );

    let store = LookupStore::aggregate(&root).unwrap();
    assert_eq!(
        store.iter().collect::<Vec<_>>(),
        vec![
            ("Bar, Version=2.0.0.0", r"..\packages\Bar.2.0\lib\net45\Bar.dll"),
            ("Foo", r"..\lib\Foo.dll"),
        ]
    );
}

#[test]
fn later_file_in_path_order_wins_on_conflict() {
    let temp = tempfile::tempdir().unwrap();
    let root = repo_root(&temp);
    create_project(&root, "b/B.csproj", &[("Foo", "from-b")]);
    create_project(&root, "a/A.csproj", &[("Foo", "from-a")]);

    let store = LookupStore::aggregate(&root).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("Foo"), Some("from-b"));
}

#[test]
fn malformed_project_is_skipped() {
    let temp = tempfile::tempdir().unwrap();
    let root = repo_root(&temp);
    create_project(&root, "good/Good.csproj", &[("Foo", "foo.dll")]);
    fs::create_dir_all(root.join("bad")).unwrap();
    fs::write(root.join("bad/Bad.csproj"), "<Project><ItemGroup></Project>").unwrap();

    let store = LookupStore::aggregate(&root).unwrap();
    assert_eq!(store.len(), 1);
    assert_eq!(store.get("Foo"), Some("foo.dll"));
}

#[test]
fn persist_then_load_round_trips() {
    let temp = tempfile::tempdir().unwrap();
    let root = repo_root(&temp);
    create_project(
        &root,
        "App.csproj",
        &[
            ("Foo, Version=1.0.0.0, Culture=neutral", r"C:\repo\packages\Foo\lib\net40\Foo.dll"),
            ("Bar", r"..\External\Bar.dll"),
        ],
    );

    let store = LookupStore::aggregate(&root).unwrap();
    let out = root.join("refs_old.json");
    store.persist(&out).unwrap();

    let text = fs::read_to_string(&out).unwrap();
    assert!(text.starts_with("{\n  \"Bar\""));

    let loaded = LookupStore::load(&out).unwrap();
    assert_eq!(loaded, store);
}

#[test]
fn remapped_store_persists_only_package_paths() {
    let temp = tempfile::tempdir().unwrap();
    let root = repo_root(&temp);
    create_project(
        &root,
        "App.csproj",
        &[
            ("Foo.Bar, Version=1.0.0.0", r"C:\repo\packages\Foo.Bar\lib\net40\Foo.Bar.dll"),
            ("Local", r"..\External\Local.dll"),
        ],
    );

    let store = LookupStore::aggregate(&root).unwrap();
    let remapped = store.remap_path_pattern(&RemapRule::package_lib());
    let out = root.join("refs.json");
    remapped.persist(&out).unwrap();

    let loaded = LookupStore::load(&out).unwrap();
    assert_eq!(
        loaded.iter().collect::<Vec<_>>(),
        vec![("Foo.Bar, Version=1.0.0.0", r"$(PkgFoo_Bar)\lib\net40\Foo.Bar.dll")]
    );
}

#[test]
fn load_missing_file_is_io_error() {
    let temp = tempfile::tempdir().unwrap();
    let err = LookupStore::load(&repo_root(&temp).join("missing.json")).unwrap_err();
    assert!(matches!(err, LookupError::Io(_)));
    assert!(err.is_precondition());
}

#[test]
fn load_malformed_file_is_format_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = repo_root(&temp).join("refs.json");
    fs::write(&path, "{\"Foo\": \"a\",}").unwrap();

    let err = LookupStore::load(&path).unwrap_err();
    match &err {
        LookupError::Format { path: p, .. } => assert!(p.ends_with("refs.json")),
        other => panic!("expected format error, got {other:?}"),
    }
    assert!(err.to_string().contains("trailing commas"));
}
