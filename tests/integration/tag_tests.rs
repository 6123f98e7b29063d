//! Entry-level (tag) validation tests.

use tiff_integrity::{validate, Location, ViolationCode, ViolationKind};

use super::test_utils::{
    strip_image_ifd, IfdBuilder, TiffBuilder, ASCII, BYTE, LONG8, STRIP_DATA,
};

/// Minimal classic image with extra entries appended after the image tags.
///
/// Returns the file and the offset of the first extra entry.
fn image_with_extras(extras: impl FnOnce(&mut IfdBuilder)) -> (Vec<u8>, u64) {
    let mut tiff = TiffBuilder::classic();
    let strips = tiff.append(&STRIP_DATA);
    let mut ifd = strip_image_ifd(&[strips, strips + 4], &[4, 4]);
    let first_extra = ifd.entry_count() as u64;
    extras(&mut ifd);

    let offset = tiff.append_ifd(&ifd);
    tiff.set_first_ifd(offset);
    let entry = tiff.entry_offset(offset, first_extra);
    (tiff.build(), entry)
}

#[test]
fn test_unknown_type_code_is_recorded_and_skipped() {
    let (data, entry) = image_with_extras(|ifd| {
        ifd.add_raw(700, 99, 4, 0);
    });

    let verdict = validate(data);
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].kind, ViolationKind::Tag);
    assert_eq!(verdict.violations[0].code, ViolationCode::UnknownFieldType);
    assert_eq!(verdict.violations[0].location, Location::Offset(entry));
}

#[test]
fn test_value_offset_past_end_of_file() {
    let (data, entry) = image_with_extras(|ifd| {
        ifd.add_raw(305, ASCII, 1000, 200);
    });
    let len = data.len() as u64;
    assert!(200 + 1000 > len);

    let verdict = validate(data);
    assert_eq!(verdict.violations.len(), 1);
    let violation = &verdict.violations[0];
    assert_eq!(violation.code, ViolationCode::ValueOutOfBounds);
    assert_eq!(violation.location, Location::Offset(entry));
    assert!(violation.detail.contains("out of bounds"), "{}", violation.detail);
}

#[test]
fn test_every_bad_entry_is_reported() {
    let (data, entry) = image_with_extras(|ifd| {
        ifd.add_raw(305, ASCII, 5000, 8) // runs past the end
            .add_raw(315, 99, 1, 0) // unknown type
            .add_raw(700, BYTE, 64, u32::MAX as u64); // offset far past the end
    });

    let verdict = validate(data);
    let tags: Vec<_> = verdict.violations_of(ViolationKind::Tag).collect();
    assert_eq!(tags.len(), 3);
    assert_eq!(tags[0].location, Location::Offset(entry));
    assert_eq!(tags[1].code, ViolationCode::UnknownFieldType);
    assert_eq!(tags[2].code, ViolationCode::ValueOutOfBounds);
    assert_eq!(verdict.violations.len(), 3);
}

#[test]
fn test_bigtiff_only_type_in_classic_file() {
    let (data, _) = image_with_extras(|ifd| {
        ifd.add_raw(700, LONG8, 1, 0);
    });

    let verdict = validate(data);
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::UnknownFieldType);
    assert!(verdict.violations[0].detail.contains("BigTIFF"));
}

#[test]
fn test_inline_values_need_no_offset_check() {
    // Four bytes fit the slot; the slot content is data, not an offset
    let (data, _) = image_with_extras(|ifd| {
        ifd.add_raw(700, BYTE, 4, 0xFFFF_FFFF);
    });
    assert!(validate(data).is_valid);
}

#[test]
fn test_broken_strip_offsets_are_a_tag_error_only() {
    let mut tiff = TiffBuilder::classic();
    tiff.append(&STRIP_DATA);

    let mut ifd = IfdBuilder::new();
    ifd.add_short(256, 4)
        .add_short(257, 2)
        .add_raw(273, 4, 2, 1 << 24) // StripOffsets array out of bounds
        .add_short(278, 1)
        .add_values(279, 4, &[4, 4]);
    let offset = tiff.append_ifd(&ifd);
    tiff.set_first_ifd(offset);

    let verdict = validate(tiff.build());
    assert_eq!(verdict.violations.len(), 1);
    assert_eq!(verdict.violations[0].code, ViolationCode::ValueOutOfBounds);
}

// =============================================================================
// Warnings
// =============================================================================

#[test]
fn test_unsorted_tags_warn_but_stay_valid() {
    let (data, _) = image_with_extras(|ifd| {
        ifd.add_short(274, 1); // Orientation after StripByteCounts
    });

    let verdict = validate(data);
    assert!(verdict.is_valid);
    assert_eq!(verdict.warnings.len(), 1);
    assert!(verdict.warnings[0].detail.contains("not sorted"));
}

#[test]
fn test_duplicate_tag_first_occurrence_wins() {
    // A second ImageWidth of 1000 would break the size check if it were used
    let (data, _) = image_with_extras(|ifd| {
        ifd.add_short(256, 1000);
    });

    let verdict = validate(data);
    assert!(verdict.is_valid, "{:?}", verdict.violations);
    assert!(verdict.warnings.iter().any(|w| w.detail.contains("duplicate")));
}

#[test]
fn test_ascii_without_terminator_warns() {
    let (data, _) = image_with_extras(|ifd| {
        let text: Vec<u64> = b"abcde".iter().map(|&b| b as u64).collect();
        ifd.add_values(305, ASCII, &text);
    });

    let verdict = validate(data);
    assert!(verdict.is_valid);
    assert_eq!(verdict.warnings.len(), 1);
    assert!(verdict.warnings[0].detail.contains("NUL"));
}
