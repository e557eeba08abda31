//! End-to-end checks over synthesized baseline images: output size,
//! format tag, sampling factors and the flat sample value.

mod common;

use common::{flat_baseline, flat_sample};
use flux_jpeg::{Decoder, OutputFormat};

#[test]
fn grayscale_128()
{
    let data = flat_baseline(128, 128, &[(1, 1, 1)], 16);

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    assert_eq!((image.width(), image.height()), (128, 128));
    assert_eq!(image.format(), OutputFormat::L);
    assert_eq!(image.sampling_factors(), vec![(1, 1)]);

    let pixels = image.linearized_data();

    assert_eq!(pixels.len(), 128 * 128);
    assert!(pixels.iter().all(|&p| p == flat_sample(16)));
}

#[test]
fn ycbcr_no_subsampling()
{
    let comps = [(1, 1, 1), (2, 1, 1), (3, 1, 1)];
    let data = flat_baseline(128, 128, &comps, 0);

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    assert_eq!(image.format(), OutputFormat::YCbCr);
    assert_eq!(image.sampling_factors(), vec![(1, 1), (1, 1), (1, 1)]);

    let pixels = image.linearized_data();

    assert_eq!(pixels.len(), 128 * 128 * 3);
    assert!(pixels.iter().all(|&p| p == 128));
}

#[test]
fn ycbcr_2x2_subsampling()
{
    let comps = [(1, 2, 2), (2, 1, 1), (3, 1, 1)];
    let data = flat_baseline(128, 128, &comps, 16);

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    assert_eq!(image.sampling_factors(), vec![(2, 2), (1, 1), (1, 1)]);

    // chroma planes are 64x64 internally, the linearized view is still
    // full size
    let pixels = image.linearized_data();

    assert_eq!(pixels.len(), 128 * 128 * 3);
    assert!(pixels.iter().all(|&p| p == flat_sample(16)));
}

#[test]
fn ycbcr_2x1_subsampling()
{
    let comps = [(1, 2, 1), (2, 1, 1), (3, 1, 1)];
    let data = flat_baseline(128, 128, &comps, 0);

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    assert_eq!(image.sampling_factors(), vec![(2, 1), (1, 1), (1, 1)]);
    assert_eq!(image.linearized_data().len(), 128 * 128 * 3);
}

#[test]
fn odd_dimensions_round_up_to_blocks()
{
    let data = flat_baseline(13, 21, &[(1, 1, 1)], -16);

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    let pixels = image.linearized_data();

    assert_eq!(pixels.len(), 13 * 21);
    assert!(pixels.iter().all(|&p| p == flat_sample(-16)));
}

#[test]
fn cmyk_component_count_sets_the_format()
{
    let comps = [(1, 1, 1), (2, 1, 1), (3, 1, 1), (4, 1, 1)];
    let data = flat_baseline(16, 16, &comps, 0);

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    assert_eq!(image.format(), OutputFormat::CMYK);
    assert_eq!(image.linearized_data().len(), 16 * 16 * 4);
}

#[test]
fn extended_sequential_decodes_like_baseline()
{
    // same stream with an SOF1 header
    let mut data = flat_baseline(16, 16, &[(1, 1, 1)], 16);

    let sof0 = data
        .windows(2)
        .position(|w| w == [0xFF, 0xC0])
        .expect("stream contains SOF0");

    data[sof0 + 1] = 0xC1;

    let mut decoder = Decoder::new();
    let image = decoder.decode_buffer(&data).expect("decode failed");

    assert!(image.linearized_data().iter().all(|&p| p == flat_sample(16)));
}

#[test]
fn identification_headers_are_flagged()
{
    let tail = flat_baseline(8, 8, &[(1, 1, 1)], 0);

    let mut data = vec![0xFF, 0xD8];

    // JFIF 1.01, no thumbnail
    common::segment(
        &mut data,
        0xE0,
        &[b'J', b'F', b'I', b'F', 0, 1, 1, 0, 0, 1, 0, 1, 0, 0],
    );

    // Adobe, version 100, zero flags, transform byte 1
    common::segment(
        &mut data,
        0xEE,
        &[b'A', b'd', b'o', b'b', b'e', 0, 100, 0, 0, 0, 0, 1],
    );

    data.extend_from_slice(&tail[2..]);

    let mut decoder = Decoder::new();

    decoder.decode_buffer(&data).expect("decode failed");

    assert!(decoder.has_jfif());
    assert!(!decoder.has_exif());
    assert_eq!(decoder.adobe_transform(), Some(1));
}

#[test]
fn decoder_info_reports_the_frame()
{
    let data = flat_baseline(24, 17, &[(1, 1, 1)], 0);

    let mut decoder = Decoder::new();

    assert!(decoder.info().is_none());

    decoder.decode_buffer(&data).expect("decode failed");

    let info = decoder.info().expect("info after decode");

    assert_eq!((info.width, info.height), (24, 17));
    assert_eq!(info.components, 1);
    assert_eq!((decoder.width(), decoder.height()), (24, 17));
}
