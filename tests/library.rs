//! End-to-end tests through the public `Library` API with the real backend.

use image::GenericImageView;
use rawshelf::archive::ExportJob;
use rawshelf::config::ShelfConfig;
use rawshelf::listing::{Breadcrumb, EntryKind};
use rawshelf::preview::SizeVariant;
use rawshelf::{ErrorKind, Library};
use std::io::{Cursor, Read};
use std::path::Path;
use tempfile::TempDir;

struct Fixture {
    root: TempDir,
    cache: TempDir,
    exports: TempDir,
}

impl Fixture {
    fn new() -> Self {
        Self {
            root: TempDir::new().unwrap(),
            cache: TempDir::new().unwrap(),
            exports: TempDir::new().unwrap(),
        }
    }

    fn jpeg(&self, rel: &str, width: u32, height: u32) -> &Self {
        let path = self.root.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 90])
        })
        .save(&path)
        .unwrap();
        self
    }

    fn file(&self, rel: &str, contents: &[u8]) -> &Self {
        let path = self.root.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, contents).unwrap();
        self
    }

    fn library(&self) -> Library {
        let mut config = ShelfConfig {
            root: self.root.path().to_path_buf(),
            cache_dir: self.cache.path().to_path_buf(),
            ..ShelfConfig::default()
        };
        config.archive.temp_dir = Some(self.exports.path().to_path_buf());
        Library::open(config).unwrap()
    }

    fn pending_exports(&self) -> usize {
        std::fs::read_dir(self.exports.path()).unwrap().count()
    }
}

fn zip_names(bytes: Vec<u8>) -> Vec<String> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    (0..archive.len())
        .map(|i| archive.by_index(i).unwrap().name().to_string())
        .collect()
}

fn cache_files(dir: &Path) -> usize {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .count()
}

#[test]
fn vacation_scenario() {
    let fixture = Fixture::new();
    fixture.jpeg("Vacation/beach.jpg", 800, 600);
    let library = fixture.library();

    let root = library.list("", false).unwrap();
    assert!(root.breadcrumbs.is_empty());
    assert_eq!(root.content.len(), 1);
    assert_eq!(root.content[0].name, "Vacation");
    assert_eq!(root.content[0].kind, EntryKind::Directory);

    let vacation = library.list("Vacation", false).unwrap();
    assert_eq!(
        vacation.breadcrumbs,
        vec![Breadcrumb {
            name: "Vacation".into(),
            path: "Vacation".into(),
        }]
    );
    assert_eq!(vacation.content.len(), 1);
    let beach = &vacation.content[0];
    assert_eq!(beach.name, "beach.jpg");
    assert_eq!(beach.relative_path, "Vacation/beach.jpg");
    assert_eq!(beach.kind, EntryKind::Image);
    assert_eq!(beach.raw_pair_path, None);
}

#[test]
fn listing_serializes_in_camel_case() {
    let fixture = Fixture::new();
    fixture
        .jpeg("Vacation/beach.jpg", 32, 32)
        .file("Vacation/beach.arw", b"raw");
    let library = fixture.library();

    let json = serde_json::to_value(library.list("Vacation", true).unwrap()).unwrap();
    let entry = &json["content"][0];
    assert_eq!(entry["name"], "beach.jpg");
    assert_eq!(entry["relativePath"], "Vacation/beach.jpg");
    assert_eq!(entry["kind"], "image");
    assert_eq!(entry["rawPairPath"], "Vacation/beach.arw");
    assert_eq!(json["breadcrumbs"][0]["path"], "Vacation");
}

#[test]
fn preview_is_rendered_once_and_bounded() {
    let fixture = Fixture::new();
    fixture.jpeg("Vacation/beach.jpg", 800, 600);
    let library = fixture.library();

    let first = library.preview("Vacation/beach.jpg", SizeVariant::Small).unwrap();
    let second = library.preview("Vacation/beach.jpg", SizeVariant::Small).unwrap();

    assert_eq!(first, second);
    assert_eq!(library.cache_stats().hits, 1);
    assert_eq!(library.cache_stats().writes, 1);
    assert_eq!(cache_files(fixture.cache.path()), 1);

    let img = image::load_from_memory(&first).unwrap();
    assert_eq!(img.dimensions(), (400, 300));
}

#[test]
fn big_preview_does_not_enlarge() {
    let fixture = Fixture::new();
    fixture.jpeg("small.jpg", 300, 200);
    let library = fixture.library();

    let bytes = library.preview("small.jpg", SizeVariant::Big).unwrap();
    assert_eq!(image::load_from_memory(&bytes).unwrap().dimensions(), (300, 200));
}

#[test]
fn traversal_is_refused_everywhere() {
    let fixture = Fixture::new();
    fixture.jpeg("Vacation/beach.jpg", 32, 32);
    let library = fixture.library();

    for path in ["..", "../..", "Vacation/../../x", "..\\..\\x"] {
        assert_eq!(
            library.list(path, false).unwrap_err().kind(),
            ErrorKind::AccessDenied,
            "{path}"
        );
    }
    assert_eq!(
        library.preview("Vacation/../../beach.jpg", SizeVariant::Small).unwrap_err().kind(),
        ErrorKind::AccessDenied
    );
}

#[test]
fn raw_export_contains_only_raw_files() {
    let fixture = Fixture::new();
    fixture
        .jpeg("a/img.jpg", 32, 32)
        .file("a/img.ARW", b"sensor data")
        .jpeg("a/lonely.jpg", 32, 32);
    let library = fixture.library();

    let mut stream = library
        .export(&ExportJob::new(["a/img.jpg", "a/lonely.jpg"], true))
        .unwrap();
    assert_eq!(stream.file_name(), "a.zip");

    let mut bytes = Vec::new();
    stream.read_to_end(&mut bytes).unwrap();
    assert_eq!(zip_names(bytes), vec!["img.ARW"]);
}

#[test]
fn abandoned_export_leaves_no_temp_file() {
    let fixture = Fixture::new();
    fixture
        .jpeg("a/one.jpg", 256, 256)
        .jpeg("a/two.jpg", 256, 256);
    let library = fixture.library();

    let mut stream = library
        .export(&ExportJob::new(["a/one.jpg", "a/two.jpg"], false))
        .unwrap();
    let temp_path = stream.path().to_path_buf();

    // Client reads a little, then disconnects
    let mut chunk = [0u8; 64];
    stream.read_exact(&mut chunk).unwrap();
    assert!(temp_path.exists());
    drop(stream);

    assert!(!temp_path.exists());
    assert_eq!(fixture.pending_exports(), 0);
}

#[test]
fn empty_export_is_bad_request() {
    let fixture = Fixture::new();
    let library = fixture.library();

    let err = library.export(&ExportJob::default()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadRequest);
    assert_eq!(err.kind().status_code(), 400);
}

#[test]
fn fetch_original_file() {
    let fixture = Fixture::new();
    fixture.jpeg("Vacation/beach.jpg", 32, 32);
    let library = fixture.library();

    let inline = library.open_file("Vacation/beach.jpg", true).unwrap();
    assert_eq!(inline.content_type, "image/jpeg");
    assert_eq!(inline.content_disposition(), r#"inline; filename="beach.jpg""#);

    let download = library.open_file("Vacation/beach.jpg", false).unwrap();
    assert_eq!(download.content_type, "application/octet-stream");
    assert_eq!(
        download.len,
        std::fs::metadata(fixture.root.path().join("Vacation/beach.jpg")).unwrap().len()
    );
}

#[test]
fn warmup_fills_cache_for_later_requests() {
    let fixture = Fixture::new();
    fixture
        .jpeg("2023/a.jpg", 500, 500)
        .jpeg("2023/Summer/b.jpg", 500, 500)
        .file("2023/Summer/broken.jpg", b"not a jpeg")
        .file("2023/notes.txt", b"hello");
    let library = fixture.library();

    let report = library.warmup(&[SizeVariant::Small]);
    assert_eq!(report.images, 3);
    assert_eq!(report.failures, 1);
    assert_eq!(cache_files(fixture.cache.path()), 2);

    library.preview("2023/Summer/b.jpg", SizeVariant::Small).unwrap();
    assert_eq!(library.cache_stats().hits, 1);
}
