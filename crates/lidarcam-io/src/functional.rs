use std::path::Path;

use lidarcam_image::{ChannelOrder, Image, ImageSize};

use crate::error::IoError;

/// Decodes an image from encoded bytes into 8-bit RGB.
///
/// Any format supported by the image crate is accepted; grayscale and alpha images are
/// converted to three channels.
///
/// # Arguments
///
/// * `bytes` - The encoded image data.
///
/// # Returns
///
/// An image with the channels in [`ChannelOrder::Rgb`] order.
pub fn decode_image_rgb8(bytes: &[u8]) -> Result<Image<u8, 3>, IoError> {
    let img = image::ImageReader::new(std::io::Cursor::new(bytes))
        .with_guessed_format()?
        .decode()?;

    let size = ImageSize {
        width: img.width() as usize,
        height: img.height() as usize,
    };

    log::debug!("decoded {:?} image of {}", img.color(), size);

    Ok(Image::new(size, img.into_rgb8().into_raw())?)
}

/// Reads an image from the given file path into 8-bit RGB.
///
/// The method tries to read from any image format supported by the image crate.
///
/// # Arguments
///
/// * `file_path` - The path to a valid image file.
///
/// # Returns
///
/// An image with the channels in [`ChannelOrder::Rgb`] order.
pub fn read_image_rgb8(file_path: impl AsRef<Path>) -> Result<Image<u8, 3>, IoError> {
    let file_path = file_path.as_ref().to_owned();

    // verify the file exists
    if !file_path.exists() {
        return Err(IoError::FileDoesNotExist(file_path));
    }

    // open the file and map it to memory
    let file = std::fs::File::open(file_path)?;
    let mmap = unsafe { memmap2::Mmap::map(&file)? };

    decode_image_rgb8(&mmap)
}

/// Reads an image from the given file path with its channels stored in `order`.
///
/// Use [`ChannelOrder::Bgr`] to get the layout of OpenCV style readers.
pub fn read_image_with_order(
    file_path: impl AsRef<Path>,
    order: ChannelOrder,
) -> Result<Image<u8, 3>, IoError> {
    let image = read_image_rgb8(file_path)?;

    match order {
        ChannelOrder::Rgb => Ok(image),
        ChannelOrder::Bgr => {
            let size = image.size();
            let mut data = image.into_vec();
            data.chunks_exact_mut(3).for_each(|px| px.swap(0, 2));
            Ok(Image::new(size, data)?)
        }
    }
}
