//! Document handle behaviour against real files.

use camino::Utf8PathBuf;
use pretty_assertions::assert_eq;
use projfix_xml::{Document, Element, Query};
use std::fs;
use tempfile::TempDir;

const MSBUILD_NS: &str = "http://schemas.microsoft.com/developer/msbuild/2003";

fn namespaced_project() -> String {
    format!(
        r#"<?xml version="1.0" encoding="utf-8"?>
<Project ToolsVersion="14.0" DefaultTargets="Build" xmlns="{MSBUILD_NS}">
  <PropertyGroup>
    <OutputType>Library</OutputType>
    <TargetFrameworkVersion>v4.5</TargetFrameworkVersion>
  </PropertyGroup>
  <ItemGroup>
    <Reference Include="Newtonsoft.Json, Version=9.0.0.0, Culture=neutral">
      <HintPath>..\packages\Newtonsoft.Json.9.0.1\lib\net45\Newtonsoft.Json.dll</HintPath>
    </Reference>
    <Reference Include="System" />
  </ItemGroup>
</Project>
"#
    )
}

fn write_project(dir: &TempDir, name: &str, contents: &str) -> Utf8PathBuf {
    let path = Utf8PathBuf::from_path_buf(dir.path().join(name)).expect("utf8 path");
    fs::write(&path, contents).expect("write project");
    path
}

#[test]
fn queries_ignore_default_namespace() {
    let with_ns = Document::parse(&namespaced_project()).unwrap();
    let without_ns =
        Document::parse(&namespaced_project().replace(&format!(" xmlns=\"{MSBUILD_NS}\""), ""))
            .unwrap();

    assert_eq!(with_ns.default_namespace(), Some(MSBUILD_NS));
    assert_eq!(without_ns.default_namespace(), None);

    let q = Query::descendant("Reference").with_attr("Include");
    for doc in [&with_ns, &without_ns] {
        let names: Vec<_> = doc.find_all(&q).filter_map(|r| r.attr("Include")).collect();
        assert_eq!(
            names,
            vec!["Newtonsoft.Json, Version=9.0.0.0, Culture=neutral", "System"]
        );
    }
}

#[test]
fn prefixed_elements_match_by_local_name() {
    let doc = Document::parse(
        r#"<msb:Project xmlns:msb="urn:x"><msb:PropertyGroup><msb:OutputType>Exe</msb:OutputType></msb:PropertyGroup></msb:Project>"#,
    )
    .unwrap();
    let q: Query = ".//{*}OutputType".parse().unwrap();
    assert_eq!(doc.find_first(&q).and_then(Element::text).as_deref(), Some("Exe"));
    assert_eq!(doc.default_namespace(), None);
}

#[test]
fn set_element_text_hits_first_descendant() {
    let mut doc = Document::parse(&namespaced_project()).unwrap();
    assert!(doc.set_element_text("TargetFrameworkVersion", "v4.6.1"));
    assert!(doc.to_xml_string().contains("<TargetFrameworkVersion>v4.6.1</TargetFrameworkVersion>"));
}

#[test]
fn set_element_text_miss_is_a_noop() {
    let mut doc = Document::parse(&namespaced_project()).unwrap();
    let before = doc.to_xml_string();
    assert!(!doc.set_element_text("RootNamespace", "X"));
    assert_eq!(doc.to_xml_string(), before);
}

#[test]
fn insert_as_child_appends_to_first_parent() {
    let mut doc = Document::parse(&namespaced_project()).unwrap();
    doc.insert_fragment_as_child(
        &Query::descendant("PropertyGroup"),
        "<QTestType>MsTest_Latest</QTestType>",
    )
    .unwrap();

    let group = doc.find_first(&Query::descendant("PropertyGroup")).unwrap();
    let last = group.child_elements().last().unwrap();
    assert_eq!(last.local_name(), "QTestType");
    assert_eq!(last.text().as_deref(), Some("MsTest_Latest"));
}

#[test]
fn insert_as_child_without_parent_is_structure_error() {
    let mut doc = Document::parse("<Project><ItemGroup /></Project>").unwrap();
    let err = doc
        .insert_fragment_as_child(&Query::descendant("PropertyGroup"), "<QTestType />")
        .unwrap_err();
    assert!(err.is_structure());
}

#[test]
fn insert_as_sibling_lands_after_anchor() {
    let mut doc = Document::parse(&namespaced_project()).unwrap();
    let inserted = doc
        .insert_fragment_as_sibling(
            &Query::descendant("PropertyGroup"),
            "<PropertyGroup><AssemblyClsCompliant>False</AssemblyClsCompliant></PropertyGroup>",
        )
        .unwrap();
    assert!(inserted);

    let order: Vec<_> = doc.root().child_elements().map(|e| e.local_name()).collect();
    assert_eq!(order, vec!["PropertyGroup", "PropertyGroup", "ItemGroup"]);
    let second = doc.root().child_elements().nth(1).unwrap();
    assert!(second.child("AssemblyClsCompliant").is_some());
}

#[test]
fn insert_as_sibling_without_anchor_does_nothing() {
    let mut doc = Document::parse("<Project><ItemGroup /></Project>").unwrap();
    let before = doc.to_xml_string();
    let inserted = doc
        .insert_fragment_as_sibling(&Query::descendant("PropertyGroup"), "<PropertyGroup />")
        .unwrap();
    assert!(!inserted);
    assert_eq!(doc.to_xml_string(), before);
}

#[test]
fn malformed_fragment_is_a_parse_error() {
    let mut doc = Document::parse(&namespaced_project()).unwrap();
    let err = doc
        .insert_fragment_as_child(&Query::descendant("PropertyGroup"), "<Open>")
        .unwrap_err();
    assert!(err.is_parse());
}

#[test]
fn open_mutate_write_back_reparses() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, "a.csproj", &namespaced_project());

    {
        let mut doc = Document::open(&path).unwrap();
        assert_eq!(doc.path(), Some(path.as_path()));
        doc.set_element_text("OutputType", "Exe");
        doc.write_back().unwrap();
    }

    let reread = Document::open(&path).unwrap();
    assert_eq!(
        reread
            .find_first(&Query::descendant("OutputType"))
            .and_then(Element::text)
            .as_deref(),
        Some("Exe")
    );
    assert_eq!(reread.default_namespace(), Some(MSBUILD_NS));
}

#[test]
fn write_back_shrinking_content_truncates() {
    let dir = tempfile::tempdir().unwrap();
    let padded = namespaced_project().replace("<PropertyGroup>", "<PropertyGroup>\n\n\n\n\n\n\n\n");
    let path = write_project(&dir, "a.csproj", &padded);

    let mut doc = Document::open(&path).unwrap();
    doc.write_back().unwrap();
    drop(doc);

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.ends_with("</Project>\n"));
    assert!(Document::parse(&on_disk).is_ok());
}

#[test]
fn write_to_leaves_source_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, "a.csproj", &namespaced_project());
    let copy = Utf8PathBuf::from_path_buf(dir.path().join("b.csproj")).unwrap();

    let mut doc = Document::open(&path).unwrap();
    doc.set_element_text("OutputType", "Exe");
    doc.write_to(&copy).unwrap();

    assert_eq!(fs::read_to_string(&path).unwrap(), namespaced_project());
    assert!(fs::read_to_string(&copy).unwrap().contains("<OutputType>Exe</OutputType>"));
}

#[test]
fn in_memory_document_cannot_write_back() {
    let mut doc = Document::parse("<Project />").unwrap();
    assert!(doc.write_back().is_err());
}

#[test]
fn open_reports_parse_and_io_errors() {
    let dir = tempfile::tempdir().unwrap();
    let bad = write_project(&dir, "bad.csproj", "<Project><ItemGroup></Project>");
    let err = Document::open(&bad).unwrap_err();
    assert!(err.is_parse());
    assert!(err.to_string().contains("bad.csproj"));

    let missing = Utf8PathBuf::from_path_buf(dir.path().join("missing.csproj")).unwrap();
    let err = Document::open(&missing).unwrap_err();
    assert!(matches!(err, projfix_xml::DocError::Io(_)));
}

#[test]
fn serialization_preserves_crlf() {
    let crlf = namespaced_project().replace('\n', "\r\n");
    let doc = Document::parse(&crlf).unwrap();
    let out = doc.to_xml_string();
    assert!(out.contains("\r\n"));
    assert!(!out.replace("\r\n", "").contains('\n'));
}

#[test]
fn canonical_input_round_trips_byte_for_byte() {
    let doc = Document::parse(&namespaced_project()).unwrap();
    assert_eq!(doc.to_xml_string(), namespaced_project());
}

#[test]
fn header_comment_and_doctype_survive_write_back() {
    let dir = tempfile::tempdir().unwrap();
    let source = format!(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- Copyright header -->\n<!DOCTYPE Project>\n{}<!-- trailer -->\n",
        namespaced_project().split_once('\n').unwrap().1
    );
    let path = write_project(&dir, "a.csproj", &source);

    let mut doc = Document::open(&path).unwrap();
    doc.set_element_text("OutputType", "Exe");
    doc.write_back().unwrap();
    drop(doc);

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.starts_with(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- Copyright header -->\n<!DOCTYPE Project>\n<Project "
    ));
    assert!(on_disk.ends_with("</Project>\n<!-- trailer -->\n"));

    let reparsed = Document::parse(&on_disk).unwrap();
    assert_eq!(reparsed.prolog().len(), 2);
    assert_eq!(reparsed.epilog().len(), 1);
    assert_eq!(reparsed.to_xml_string(), on_disk);
}

#[test]
fn write_back_can_repeat_through_the_same_handle() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, "a.csproj", &namespaced_project());

    let mut doc = Document::open(&path).unwrap();
    doc.set_element_text("OutputType", "Exe");
    doc.write_back().unwrap();
    doc.set_element_text("OutputType", "WinExe");
    doc.write_back().unwrap();
    drop(doc);

    let on_disk = fs::read_to_string(&path).unwrap();
    assert!(on_disk.contains("<OutputType>WinExe</OutputType>"));
    let leftovers: Vec<_> = fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec![std::ffi::OsString::from("a.csproj")]);
}

#[cfg(unix)]
#[test]
fn write_back_keeps_file_permissions() {
    use std::os::unix::fs::PermissionsExt;

    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, "a.csproj", &namespaced_project());
    fs::set_permissions(&path, fs::Permissions::from_mode(0o644)).unwrap();

    let mut doc = Document::open(&path).unwrap();
    doc.set_element_text("OutputType", "Exe");
    doc.write_back().unwrap();

    let mode = fs::metadata(&path).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o644);
}

#[test]
fn read_only_file_can_still_be_queried() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_project(&dir, "a.csproj", &namespaced_project());
    let mut perms = fs::metadata(&path).unwrap().permissions();
    perms.set_readonly(true);
    fs::set_permissions(&path, perms).unwrap();

    let doc = Document::open(&path).unwrap();
    assert_eq!(
        doc.find_first(&Query::descendant("OutputType"))
            .and_then(Element::text)
            .as_deref(),
        Some("Library")
    );
    drop(doc);

    let mut perms = fs::metadata(&path).unwrap().permissions();
    #[allow(clippy::permissions_set_readonly_false)]
    perms.set_readonly(false);
    fs::set_permissions(&path, perms).unwrap();
}
