use std::fs;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::{GenericImageView, ImageFormat};
use log::{debug, info, trace};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::error::MangaError;

/// PDF forbids page sides longer than 200 inches.
const MAX_PAGE_SIDE_PT: f32 = 200.0 * 72.0;
/// Page height used when an image is too large for its natural size (7 inches).
const FALLBACK_PAGE_HEIGHT_PT: f32 = 7.0 * 72.0;
/// Images are laid out at 96 dpi.
const PT_PER_PIXEL: f32 = 72.0 / 96.0;
const JPEG_QUALITY: u8 = 90;

/// Generates a PDF from a collection of image paths, one page per image in
/// the given order. An existing file at `output_path` is replaced.
pub fn create_pdf_from_images(image_paths: &[impl AsRef<Path>], output_path: &Path) -> Result<(), MangaError> {
    if image_paths.is_empty() {
        return Err(MangaError::ConversionError(String::from("Cannot create PDF: no images provided")));
    }

    debug!("Creating PDF from {} images", image_paths.len());
    trace!("Output path: {:?}", output_path);

    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let mut kids: Vec<Object> = Vec::with_capacity(image_paths.len());
    for (i, path) in image_paths.iter().enumerate() {
        trace!("Processing image {}/{}", i + 1, image_paths.len());
        let page_id = add_image_page(&mut doc, pages_id, path.as_ref())?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut data = Vec::new();
    doc.save_to(&mut data)
        .map_err(|e| MangaError::ConversionError(format!("Failed to serialize PDF: {}", e)))?;

    if output_path.exists() {
        debug!("Replacing existing {}", output_path.display());
        fs::remove_file(output_path)?;
    }
    fs::write(output_path, data)?;

    info!("PDF created successfully with {} pages: {}", page_count, output_path.display());
    Ok(())
}

/// Embeds one image as a JPEG XObject on its own page and returns the page id.
fn add_image_page(doc: &mut Document, pages_id: ObjectId, path: &Path) -> Result<ObjectId, MangaError> {
    let bytes = fs::read(path)?;
    let format = image::guess_format(&bytes)
        .map_err(|e| MangaError::ConversionError(format!("Unknown image format {}: {}", path.display(), e)))?;
    let img = image::load_from_memory_with_format(&bytes, format)
        .map_err(|e| MangaError::ConversionError(format!("Failed to load image {}: {}", path.display(), e)))?;
    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(MangaError::ConversionError(format!("Image {} is empty", path.display())));
    }

    // JPEG pages are embedded as-is, everything else is re-encoded
    let passthrough = match format {
        ImageFormat::Jpeg => match jpeg_components(&bytes) {
            Some(1) => Some("DeviceGray"),
            Some(3) => Some("DeviceRGB"),
            _ => None,
        },
        _ => None,
    };
    let (color_space, jpeg) = match passthrough {
        Some(color_space) => {
            trace!("Embedding {} without re-encoding", path.display());
            (color_space, bytes)
        }
        None => {
            let rgb = img.to_rgb8();
            let mut jpeg = Vec::new();
            rgb.write_with_encoder(JpegEncoder::new_with_quality(&mut jpeg, JPEG_QUALITY))
                .map_err(|e| MangaError::ConversionError(format!("Failed to encode image {}: {}", path.display(), e)))?;
            ("DeviceRGB", jpeg)
        }
    };

    let image_id = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => width as i64,
            "Height" => height as i64,
            "ColorSpace" => color_space,
            "BitsPerComponent" => 8_i64,
            "Filter" => "DCTDecode",
        },
        jpeg,
    ));

    let (page_width, page_height) = page_size(width, height);
    trace!("Image {}x{} on a {:.1}x{:.1}pt page", width, height, page_width, page_height);

    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![page_width.into(), 0_i64.into(), 0_i64.into(), page_height.into(), 0_i64.into(), 0_i64.into()],
            ),
            Operation::new("Do", vec!["Im0".into()]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "MediaBox" => vec![0_i64.into(), 0_i64.into(), page_width.into(), page_height.into()],
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                "Im0" => image_id,
            },
        },
    }))
}

/// Page size in points for an image of `width`x`height` pixels.
///
/// Pages that would exceed the PDF size limit are laid out 7 inches tall
/// instead, keeping the aspect ratio.
pub fn page_size(width: u32, height: u32) -> (f32, f32) {
    let natural = (width as f32 * PT_PER_PIXEL, height as f32 * PT_PER_PIXEL);
    if natural.0 <= MAX_PAGE_SIDE_PT && natural.1 <= MAX_PAGE_SIDE_PT {
        return natural;
    }

    let aspect = width as f32 / height as f32;
    let (mut page_width, mut page_height) = (FALLBACK_PAGE_HEIGHT_PT * aspect, FALLBACK_PAGE_HEIGHT_PT);
    if page_width > MAX_PAGE_SIDE_PT {
        page_height *= MAX_PAGE_SIDE_PT / page_width;
        page_width = MAX_PAGE_SIDE_PT;
    }
    (page_width, page_height)
}

/// Number of color components declared by a JPEG's start-of-frame marker.
fn jpeg_components(bytes: &[u8]) -> Option<u8> {
    if !bytes.starts_with(&[0xFF, 0xD8]) {
        return None;
    }
    let mut pos = 2;
    while pos + 4 <= bytes.len() {
        if bytes[pos] != 0xFF {
            return None;
        }
        let marker = bytes[pos + 1];
        // fill bytes
        if marker == 0xFF {
            pos += 1;
            continue;
        }
        let len = u16::from_be_bytes([bytes[pos + 2], bytes[pos + 3]]) as usize;
        // SOF0..SOF15, minus DHT (C4), JPG (C8) and DAC (CC)
        if (0xC0..=0xCF).contains(&marker) && !matches!(marker, 0xC4 | 0xC8 | 0xCC) {
            return bytes.get(pos + 9).copied();
        }
        pos += 2 + len;
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    // Helper to create a temporary test image
    fn create_test_image(path: &Path, width: u32, height: u32) {
        let mut img = image::RgbImage::new(width, height);
        for (x, y, pixel) in img.enumerate_pixels_mut() {
            *pixel = image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8]);
        }
        img.save(path).unwrap();
    }

    fn media_boxes(doc: &Document) -> Vec<(f32, f32)> {
        doc.get_pages()
            .values()
            .map(|id| {
                let page = doc.get_object(*id).unwrap().as_dict().unwrap();
                let media_box = page.get(b"MediaBox").unwrap().as_array().unwrap();
                (media_box[2].as_float().unwrap(), media_box[3].as_float().unwrap())
            })
            .collect()
    }

    #[test]
    fn test_create_pdf_from_images() {
        let temp_dir = tempfile::tempdir().unwrap();

        let test_images = vec![
            temp_dir.path().join("page1.jpg"),
            temp_dir.path().join("page2.png"),
            temp_dir.path().join("page3.jpg"),
        ];
        create_test_image(&test_images[0], 800, 1200);
        create_test_image(&test_images[1], 600, 900);
        create_test_image(&test_images[2], 1000, 1500);

        let output_path = temp_dir.path().join("c1.pdf");
        create_pdf_from_images(&test_images, &output_path).unwrap();

        let doc = Document::load(&output_path).unwrap();
        assert_eq!(doc.get_pages().len(), 3);
        // pages follow the order of the input images
        assert_eq!(media_boxes(&doc), vec![(600.0, 900.0), (450.0, 675.0), (750.0, 1125.0)]);
    }

    #[test]
    fn test_create_pdf_replaces_existing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let image = temp_dir.path().join("page1.png");
        create_test_image(&image, 40, 60);

        let output_path = temp_dir.path().join("c1.pdf");
        fs::write(&output_path, b"stale").unwrap();

        create_pdf_from_images(&[&image], &output_path).unwrap();
        let doc = Document::load(&output_path).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn test_create_pdf_without_images() {
        let temp_dir = tempfile::tempdir().unwrap();
        let output_path = temp_dir.path().join("c1.pdf");
        let no_images: Vec<&Path> = Vec::new();

        let result = create_pdf_from_images(&no_images, &output_path);
        assert!(matches!(result, Err(MangaError::ConversionError(_))));
        assert!(!output_path.exists());
    }

    #[test]
    fn test_create_pdf_with_broken_image() {
        let temp_dir = tempfile::tempdir().unwrap();
        let good = temp_dir.path().join("page1.png");
        let broken = temp_dir.path().join("page2.jpg");
        create_test_image(&good, 40, 60);
        fs::write(&broken, b"not an image").unwrap();

        let output_path = temp_dir.path().join("c1.pdf");
        let result = create_pdf_from_images(&[&good, &broken], &output_path);
        assert!(matches!(result, Err(MangaError::ConversionError(_))));
        assert!(!output_path.exists());
    }

    fn embedded_images(doc: &Document) -> Vec<&Stream> {
        doc.get_pages()
            .values()
            .map(|id| {
                let page = doc.get_object(*id).unwrap().as_dict().unwrap();
                let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
                let image_id = resources.get(b"XObject").unwrap().as_dict().unwrap().get(b"Im0").unwrap();
                doc.get_object(image_id.as_reference().unwrap()).unwrap().as_stream().unwrap()
            })
            .collect()
    }

    #[test]
    fn test_jpeg_pages_are_embedded_unchanged() {
        let temp_dir = tempfile::tempdir().unwrap();
        let color = temp_dir.path().join("page1.jpg");
        let gray = temp_dir.path().join("page2.jpg");
        create_test_image(&color, 64, 96);
        image::GrayImage::from_fn(32, 48, |x, y| image::Luma([((x * y) % 256) as u8])).save(&gray).unwrap();

        let output_path = temp_dir.path().join("c1.pdf");
        create_pdf_from_images(&[&color, &gray], &output_path).unwrap();

        let doc = Document::load(&output_path).unwrap();
        let images = embedded_images(&doc);
        assert_eq!(images[0].content, fs::read(&color).unwrap());
        assert_eq!(images[0].dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceRGB");
        assert_eq!(images[1].content, fs::read(&gray).unwrap());
        assert_eq!(images[1].dict.get(b"ColorSpace").unwrap().as_name().unwrap(), b"DeviceGray");
    }

    #[test]
    fn test_png_named_jpg_is_converted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let png = temp_dir.path().join("page1.png");
        create_test_image(&png, 40, 60);
        let mislabelled = temp_dir.path().join("page_001.jpg");
        fs::rename(&png, &mislabelled).unwrap();

        let output_path = temp_dir.path().join("c1.pdf");
        create_pdf_from_images(&[&mislabelled], &output_path).unwrap();

        let doc = Document::load(&output_path).unwrap();
        let images = embedded_images(&doc);
        assert_eq!(images[0].dict.get(b"Width").unwrap().as_i64().unwrap(), 40);
        // re-encoded, so the PNG bytes are not passed through
        assert!(images[0].content.starts_with(&[0xFF, 0xD8]));
    }

    #[test]
    fn test_jpeg_components() {
        let temp_dir = tempfile::tempdir().unwrap();
        let color = temp_dir.path().join("color.jpg");
        create_test_image(&color, 8, 8);
        assert_eq!(jpeg_components(&fs::read(&color).unwrap()), Some(3));
        assert_eq!(jpeg_components(b"\x89PNG\r\n"), None);
        assert_eq!(jpeg_components(&[0xFF, 0xD8, 0xFF]), None);
    }

    #[test]
    fn test_page_size() {
        assert_eq!(page_size(800, 1200), (600.0, 900.0));

        // 20000px tall would be a 208 inch page
        let (w, h) = page_size(1000, 20000);
        assert_eq!(h, FALLBACK_PAGE_HEIGHT_PT);
        assert!((w - 25.2).abs() < 0.01);

        // very wide strips are capped on width instead
        let (w, h) = page_size(100_000, 10);
        assert_eq!(w, MAX_PAGE_SIDE_PT);
        assert!(h <= MAX_PAGE_SIDE_PT);
    }
}
