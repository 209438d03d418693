use crate::error::ImageError;

/// Image size in pixels
///
/// A struct to represent the size of an image in pixels.
///
/// # Examples
///
/// ```
/// use lidarcam_image::ImageSize;
///
/// let image_size = ImageSize {
///   width: 10,
///   height: 20,
/// };
///
/// assert_eq!(image_size.width, 10);
/// assert_eq!(image_size.height, 20);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ImageSize {
    /// Width of the image in pixels
    pub width: usize,
    /// Height of the image in pixels
    pub height: usize,
}

impl std::fmt::Display for ImageSize {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "ImageSize {{ width: {}, height: {} }}",
            self.width, self.height
        )
    }
}

impl From<[usize; 2]> for ImageSize {
    fn from(size: [usize; 2]) -> Self {
        ImageSize {
            width: size[0],
            height: size[1],
        }
    }
}

/// Represents an image with pixel data.
///
/// The pixel data is stored row-major with interleaved channels, i.e. with shape (H, W, C).
/// Row `v` and column `u` start at offset `(v * width + u) * CHANNELS`.
#[derive(Clone, Debug, PartialEq)]
pub struct Image<T, const CHANNELS: usize> {
    size: ImageSize,
    data: Vec<T>,
}

impl<T, const CHANNELS: usize> Image<T, CHANNELS> {
    /// Create a new image from pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `data` - The pixel data of the image.
    ///
    /// # Errors
    ///
    /// If the length of the pixel data does not match the image size, an error is returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use lidarcam_image::{Image, ImageSize};
    ///
    /// let image = Image::<u8, 3>::new(
    ///     ImageSize {
    ///         width: 10,
    ///         height: 20,
    ///     },
    ///     vec![0u8; 10 * 20 * 3],
    /// ).unwrap();
    ///
    /// assert_eq!(image.size().width, 10);
    /// assert_eq!(image.size().height, 20);
    /// assert_eq!(image.num_channels(), 3);
    /// ```
    pub fn new(size: ImageSize, data: Vec<T>) -> Result<Self, ImageError> {
        let expected = size.width * size.height * CHANNELS;
        if data.len() != expected {
            return Err(ImageError::InvalidChannelShape(data.len(), expected));
        }

        Ok(Self { size, data })
    }

    /// Create a new image with the given size and default pixel data.
    ///
    /// # Arguments
    ///
    /// * `size` - The size of the image in pixels.
    /// * `val` - The default value of the pixel data.
    pub fn from_size_val(size: ImageSize, val: T) -> Result<Self, ImageError>
    where
        T: Clone,
    {
        let data = vec![val; size.width * size.height * CHANNELS];
        Image::new(size, data)
    }

    /// Get the size of the image in pixels.
    pub fn size(&self) -> ImageSize {
        self.size
    }

    /// Get the width of the image in pixels.
    pub fn width(&self) -> usize {
        self.size.width
    }

    /// Get the height of the image in pixels.
    pub fn height(&self) -> usize {
        self.size.height
    }

    /// Get the number of channels in the image.
    pub fn num_channels(&self) -> usize {
        CHANNELS
    }

    /// Consume the image and return its raw pixel data.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Whether the column `u` and row `v` fall inside the image rectangle.
    ///
    /// Signed coordinates are accepted so that projected pixels can be tested directly.
    #[inline]
    pub fn contains(&self, u: i64, v: i64) -> bool {
        u >= 0 && v >= 0 && (u as u64) < self.size.width as u64 && (v as u64) < self.size.height as u64
    }

    /// Get all the channels of the pixel at column `u` and row `v`.
    ///
    /// NOTE: `u` indexes the width and `v` the height, so the lookup is `data[v][u]`.
    ///
    /// # Errors
    ///
    /// If the coordinates are out of bounds, an error is returned.
    pub fn get_pixel(&self, u: usize, v: usize) -> Result<[T; CHANNELS], ImageError>
    where
        T: Copy + Default,
    {
        if u >= self.width() || v >= self.height() {
            return Err(ImageError::PixelIndexOutOfBounds(
                u,
                v,
                self.width(),
                self.height(),
            ));
        }

        let offset = (v * self.width() + u) * CHANNELS;
        let mut pixel = [T::default(); CHANNELS];
        pixel.copy_from_slice(&self.data[offset..offset + CHANNELS]);

        Ok(pixel)
    }

    /// Get a single channel value of the pixel at column `u` and row `v`.
    pub fn get(&self, u: usize, v: usize, ch: usize) -> Result<T, ImageError>
    where
        T: Copy,
    {
        if u >= self.width() || v >= self.height() {
            return Err(ImageError::PixelIndexOutOfBounds(
                u,
                v,
                self.width(),
                self.height(),
            ));
        }

        if ch >= CHANNELS {
            return Err(ImageError::ChannelIndexOutOfBounds(ch, CHANNELS));
        }

        Ok(self.data[(v * self.width() + u) * CHANNELS + ch])
    }
}
