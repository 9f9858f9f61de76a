//! Reading `.hpkr` repository indexes.

mod common;

use common::{write_temp, HpkrBuilder, SectionData, Stream};
use hpkg_format::{AttributeId, DecodeError, FileKind, HpkrFile, PkgError};

fn packages() -> SectionData {
    let mut s = Stream::new();
    for (index, version) in [(0u64, "1.0"), (1, "2.4")].iter() {
        s.string(AttributeId::Package, "ignored", true)
            .table(AttributeId::PackageName, *index, false)
            .string(AttributeId::PackageVersionMajor, version, false)
            .int(AttributeId::PackageArchitecture, 0)
            .table(AttributeId::PackageLicense, 2, false)
            .end();
    }
    s.end();
    SectionData::new(&["alpha", "beta", "MIT"], &s)
}

fn repository(chunk_size: Option<u32>) -> HpkrBuilder {
    HpkrBuilder {
        // Stands in for the repository info section.
        info: b"\x01\x02\x03\x04\x05\x00".to_vec(),
        packages: packages(),
        chunk_size,
    }
}

fn check(file: &HpkrFile) {
    let pkgs = file.packages().collect::<Result<Vec<_>, _>>().unwrap();
    let names: Vec<_> = pkgs.iter().map(ToString::to_string).collect();
    assert_eq!(names, vec!["alpha-1.0-any", "beta-2.4-any"]);
    assert!(pkgs.iter().all(|p| p.licenses() == vec!["MIT".to_string()].as_slice()));
}

#[test]
fn lists_packages() {
    let (_dir, path) = write_temp("repo.hpkr", &repository(None).build());
    assert_eq!(FileKind::detect(&path).unwrap(), FileKind::Repository);

    let file = HpkrFile::open(&path).unwrap();
    assert_eq!(file.header().info_length, 6);
    assert_eq!(file.packages_context().strings().len(), 3);
    check(&file);
}

#[cfg(feature = "zlib")]
#[test]
fn lists_packages_from_zlib_heap() {
    let (_dir, path) = write_temp("repo.hpkr", &repository(Some(16)).build());
    let file = HpkrFile::open(&path).unwrap();
    assert!(file.heap().chunk_count() > 1);
    check(&file);
}

#[test]
fn package_roots_keep_their_children() {
    let file = HpkrFile::from_bytes(repository(None).build()).unwrap();
    let roots = file.package_attributes().collect::<Result<Vec<_>, _>>().unwrap();
    assert_eq!(roots.len(), 2);
    assert!(roots.iter().all(|r| r.id() == AttributeId::Package));
    assert_eq!(roots[1].children().len(), 4);
    assert_eq!(roots[0].node_count(), 5);
}

#[test]
fn corrupt_package_list_stops_iteration() {
    let mut builder = repository(None);
    // An attribute id outside the known range.
    builder.packages.stream = vec![0x7f, 0x00];
    let file = HpkrFile::from_bytes(builder.build()).unwrap();

    let mut iter = file.packages();
    assert!(!iter.has_next());
    match iter.next() {
        Some(Err(PkgError::Decode(DecodeError::UnknownAttributeId { id, .. }))) => {
            assert_eq!(id, 0x7e)
        }
        other => panic!("unexpected result {:?}", other),
    }
    assert!(iter.next().is_none());
}

#[test]
fn package_header_is_not_a_repository() {
    let mut bytes = repository(None).build();
    bytes[..4].copy_from_slice(b"hpkg");
    assert!(matches!(
        HpkrFile::from_bytes(bytes),
        Err(DecodeError::BadMagic(_))
    ));
}
