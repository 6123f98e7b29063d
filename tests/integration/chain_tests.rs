//! IFD chain and sub-IFD traversal tests.

use tiff_integrity::{
    validate, Location, Validator, ValidatorConfig, ViolationCode, ViolationKind,
};

use super::test_utils::{
    metadata_ifd, strip_image_ifd, TiffBuilder, LONG, STRIP_DATA, UNDEFINED,
};

/// Classic file with `pages` valid image directories sharing one strip blob.
///
/// Returns the builder and the directory offsets in chain order; the chain
/// is linked and terminated.
fn multi_page(pages: usize) -> (TiffBuilder, Vec<u64>) {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);
    let ifd = strip_image_ifd(&[strips, strips + 4], &[4, 4]);

    let offsets: Vec<u64> = (0..pages).map(|_| tiff.append_ifd(&ifd)).collect();
    tiff.set_first_ifd(offsets[0]);
    for pair in offsets.windows(2) {
        tiff.link(pair[0], pair[1]);
    }
    (tiff, offsets)
}

// =============================================================================
// Main chain
// =============================================================================

#[test]
fn test_multi_page_file_is_valid() {
    let (tiff, _) = multi_page(3);
    let verdict = validate(tiff.build());
    assert!(verdict.is_valid, "{:?}", verdict.violations);
}

#[test]
fn test_cycle_of_length_one() {
    let (mut tiff, offsets) = multi_page(1);
    tiff.link(offsets[0], offsets[0]);

    let verdict = validate(tiff.build());
    assert!(!verdict.is_valid);
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].kind, ViolationKind::Chain);
    assert_eq!(verdict.violations[0].code, ViolationCode::CyclicChain);
    assert_eq!(verdict.violations[0].location, Location::Offset(offsets[0]));
}

#[test]
fn test_cycle_of_length_one_thousand() {
    let (mut tiff, offsets) = multi_page(1000);
    tiff.link(offsets[999], offsets[0]);

    let verdict = validate(tiff.build());
    let chain: Vec<_> = verdict.violations_of(ViolationKind::Chain).collect();
    assert_eq!(chain.len(), 1);
    assert_eq!(chain[0].code, ViolationCode::CyclicChain);
    assert_eq!(verdict.violations.len(), 1);
}

#[test]
fn test_cycle_back_into_middle_of_chain() {
    let (mut tiff, offsets) = multi_page(10);
    tiff.link(offsets[9], offsets[4]);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].location, Location::Offset(offsets[4]));
}

#[test]
fn test_chain_length_cap() {
    let (tiff, offsets) = multi_page(20);
    let validator = Validator::new(ValidatorConfig {
        max_chain_length: 10,
        ..Default::default()
    });

    let verdict = validator.validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::ChainTooLong);
    assert_eq!(verdict.violations[0].location, Location::Offset(offsets[10]));
}

#[test]
fn test_next_offset_past_end_stops_chain() {
    let (mut tiff, offsets) = multi_page(2);
    tiff.link(offsets[1], 1 << 20);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].kind, ViolationKind::Ifd);
    assert_eq!(verdict.violations[0].code, ViolationCode::UnreachableDirectory);
    assert_eq!(verdict.violations[0].location, Location::Ifd(2));
}

#[test]
fn test_first_offset_zero_is_empty_chain() {
    let mut tiff = TiffBuilder::classic();
    tiff.append(&STRIP_DATA);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].kind, ViolationKind::Ifd);
    assert_eq!(verdict.violations[0].code, ViolationCode::EmptyChain);
}

#[test]
fn test_empty_directory_in_chain() {
    let (mut tiff, offsets) = multi_page(1);
    let empty = tiff.append(&[0, 0, 0, 0, 0, 0]);
    tiff.link(offsets[0], empty);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::EmptyDirectory);
}

// =============================================================================
// Sub-IFDs
// =============================================================================

#[test]
fn test_subifd_images_are_layout_checked() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);

    // Thumbnail whose second strip points past the end of the file
    let thumb = tiff.append_ifd(&strip_image_ifd(&[strips, 1 << 20], &[4, 4]));

    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_values(330, LONG, &[thumb]);
    let first = tiff.append_ifd(&main);
    tiff.set_first_ifd(first);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1, "{:?}", verdict.violations);
    assert_eq!(verdict.violations[0].code, ViolationCode::DataOutOfBounds);
    assert_eq!(
        verdict.violations[0].location,
        Location::Segment {
            ifd_offset: thumb,
            index: 1
        }
    );
}

#[test]
fn test_exif_directory_is_not_layout_checked() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);
    let exif = tiff.append_ifd(&metadata_ifd());

    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_long(34665, exif);
    let first = tiff.append_ifd(&main);
    tiff.set_first_ifd(first);

    let verdict = validate(tiff.build());
    assert!(verdict.is_valid, "{:?}", verdict.violations);
}

#[test]
fn test_shared_subifd_is_not_a_cycle() {
    // Two SubIFDs entries naming the same directory get isolated guards
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);
    let thumb = tiff.append_ifd(&strip_image_ifd(&[strips, strips + 4], &[4, 4]));

    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_values(330, LONG, &[thumb, thumb]);
    let first = tiff.append_ifd(&main);
    tiff.set_first_ifd(first);

    let verdict = validate(tiff.build());
    assert!(verdict.is_valid, "{:?}", verdict.violations);
}

#[test]
fn test_subifd_cycle_does_not_stop_main_chain() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);

    // EXIF chain that loops on itself
    let exif = tiff.append_ifd(&metadata_ifd());
    tiff.link(exif, exif);

    let mut first_page = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    first_page.add_long(34665, exif);
    let first = tiff.append_ifd(&first_page);

    // Second page with short uncompressed byte counts
    let second = tiff.append_ifd(&strip_image_ifd(&[strips, strips + 4], &[4, 2]));
    tiff.set_first_ifd(first);
    tiff.link(first, second);

    let verdict = validate(tiff.build());
    let codes: Vec<_> = verdict.violations.iter().map(|v| v.code).collect();
    assert_eq!(
        codes,
        vec![ViolationCode::CyclicChain, ViolationCode::ByteCountMismatch]
    );
    assert_eq!(verdict.violations[1].location, Location::Ifd(1));
}

#[test]
fn test_subifd_pointing_at_parent_is_a_cycle() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);

    // The image's SubIFDs entry names the image itself
    let first = tiff.offset() + 16; // two LONG arrays land before the directory
    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_long(330, first);
    let placed = tiff.append_ifd(&main);
    assert_eq!(placed, first);
    tiff.set_first_ifd(first);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::CyclicChain);
}

#[test]
fn test_subifd_depth_cap() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);

    // Three nested EXIF-style directories below the main image
    let deepest = tiff.append_ifd(&metadata_ifd());
    let mut middle = metadata_ifd();
    middle.add_long(34665, deepest);
    let middle = tiff.append_ifd(&middle);
    let mut top = metadata_ifd();
    top.add_long(34665, middle);
    let top = tiff.append_ifd(&top);

    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_long(34665, top);
    let first = tiff.append_ifd(&main);
    tiff.set_first_ifd(first);
    let data = tiff.build();

    assert!(validate(data.clone()).is_valid);

    let shallow = Validator::new(ValidatorConfig {
        max_subifd_depth: 2,
        ..Default::default()
    });
    let verdict = shallow.validate(data);
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::SubIfdTooDeep);
    assert_eq!(verdict.violations[0].location, Location::Offset(deepest));
}

#[test]
fn test_directory_budget_spans_sub_ifds() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);

    let pages: Vec<(u64, u64)> = (0..2)
        .map(|_| {
            let exif = tiff.append_ifd(&metadata_ifd());
            let mut page = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
            page.add_long(34665, exif);
            (tiff.append_ifd(&page), exif)
        })
        .collect();
    tiff.set_first_ifd(pages[0].0);
    tiff.link(pages[0].0, pages[1].0);

    // page, EXIF, page is three directories; the second EXIF is the fourth
    let validator = Validator::new(ValidatorConfig {
        max_directories: 3,
        ..Default::default()
    });
    let verdict = validator.validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::ChainTooLong);
    assert_eq!(verdict.violations[0].location, Location::Offset(pages[1].1));
}

#[test]
fn test_repeated_exif_offsets_are_validated_once() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);

    // A duplicated tag makes every validation of this directory warn
    let mut exif = metadata_ifd();
    exif.add_values(36864, UNDEFINED, &[b'0' as u64, b'2' as u64, b'3' as u64, b'2' as u64]);
    let exif = tiff.append_ifd(&exif);

    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_values(34665, LONG, &vec![exif; 2000]);
    let first = tiff.append_ifd(&main);
    tiff.set_first_ifd(first);
    let data = tiff.build();

    let verdict = validate(data.clone());
    assert!(verdict.is_valid, "{:?}", verdict.violations);
    assert_eq!(verdict.warnings.len(), 1);
    assert_eq!(verdict.warnings[0].location, Location::Offset(exif + 2 + 12));

    // Only the main image and one EXIF visit are charged
    let validator = Validator::new(ValidatorConfig {
        max_directories: 2,
        ..Default::default()
    });
    assert!(validator.validate(data).is_valid);
}

#[test]
fn test_sub_chain_reaching_main_chain_reports_once() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);
    let exif = tiff.append_ifd(&metadata_ifd());

    let mut first_page = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    first_page.add_long(34665, exif);
    let first = tiff.append_ifd(&first_page);

    // Second page with short uncompressed byte counts, also the EXIF's next
    let second = tiff.append_ifd(&strip_image_ifd(&[strips, strips + 4], &[4, 2]));
    tiff.set_first_ifd(first);
    tiff.link(first, second);
    tiff.link(exif, second);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1, "{:?}", verdict.violations);
    assert_eq!(verdict.violations[0].code, ViolationCode::ByteCountMismatch);
    assert_eq!(verdict.violations[0].location, Location::Ifd(1));
}

#[test]
fn test_sub_chain_linking_back_to_parent_is_a_cycle() {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);
    let exif = tiff.append_ifd(&metadata_ifd());

    let mut main = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    main.add_long(34665, exif);
    let first = tiff.append_ifd(&main);
    tiff.set_first_ifd(first);
    tiff.link(exif, first);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::CyclicChain);
    assert_eq!(verdict.violations[0].location, Location::Offset(first));
}
