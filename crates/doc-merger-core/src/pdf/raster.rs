//! Raster image pages: one page per image, sized to the pixel dimensions.

use image::{DynamicImage, GenericImageView, ImageFormat};
use lopdf::{Object, Stream, dictionary};

use crate::error::ConvertError;
use super::builder::DocumentBuilder;
use super::document::PageDocument;

/// Resource name of the image XObject inside its page.
const IMAGE_RESOURCE: &str = "Im0";

/// Decode an image and place it on a page exactly its pixel size.
///
/// The image is drawn at the origin filling the whole page. Transparency
/// is kept as a soft mask; 16-bit channels are reduced to 8 bits.
pub fn image_document(bytes: &[u8], format: ImageFormat) -> Result<PageDocument, ConvertError> {
    let label = format_label(format);
    let img = image::load_from_memory_with_format(bytes, format)
        .map_err(|e| ConvertError::corrupt(label, e))?;

    let (width, height) = img.dimensions();
    if width == 0 || height == 0 {
        return Err(ConvertError::corrupt(label, "image has zero size"));
    }

    let mut builder = DocumentBuilder::new();
    let stream = image_stream(&mut builder, &img);
    let image_id = builder.add_object(Object::Stream(stream));

    let resources = dictionary! {
        "XObject" => dictionary! {
            IMAGE_RESOURCE => Object::Reference(image_id),
        },
    };
    let content = format!("q\n{width} 0 0 {height} 0 0 cm\n/{IMAGE_RESOURCE} Do\nQ\n");

    builder.add_page(i64::from(width), i64::from(height), content, resources);
    Ok(builder.finish())
}

/// Build the image XObject, registering a soft mask first when needed.
fn image_stream(builder: &mut DocumentBuilder, img: &DynamicImage) -> Stream {
    let (width, height) = img.dimensions();
    let color = img.color();

    let (color_space, samples) = if color.has_color() {
        ("DeviceRGB", img.to_rgb8().into_raw())
    } else {
        ("DeviceGray", img.to_luma8().into_raw())
    };

    let mut dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => i64::from(width),
        "Height" => i64::from(height),
        "ColorSpace" => color_space,
        "BitsPerComponent" => 8i64,
    };

    if color.has_alpha() {
        let alpha: Vec<u8> = img.to_rgba8().pixels().map(|p| p.0[3]).collect();
        let mask = Stream::new(
            dictionary! {
                "Type" => "XObject",
                "Subtype" => "Image",
                "Width" => i64::from(width),
                "Height" => i64::from(height),
                "ColorSpace" => "DeviceGray",
                "BitsPerComponent" => 8i64,
            },
            alpha,
        );
        let mask_id = builder.add_object(Object::Stream(mask));
        dict.set("SMask", Object::Reference(mask_id));
    }

    Stream::new(dict, samples)
}

const fn format_label(format: ImageFormat) -> &'static str {
    match format {
        ImageFormat::Png => "PNG",
        ImageFormat::Jpeg => "JPEG",
        _ => "image",
    }
}
