use serde::{Deserialize, Serialize};

/// Maximum raw value of an 8-bit channel.
const U8_MAX: f64 = 255.0;

/// The order in which the color channels of a 3-channel image are stored.
///
/// Colored points are always emitted in red-green-blue order, so images stored in any
/// other order are permuted when sampled. The default is [`ChannelOrder::Bgr`], the
/// layout produced by most OpenCV-style image readers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelOrder {
    /// Red, green, blue.
    Rgb,
    /// Blue, green, red.
    #[default]
    Bgr,
}

impl ChannelOrder {
    /// The source channel index for each output (RGB) channel.
    ///
    /// Output channel `k` equals source channel `permutation()[k]`.
    ///
    /// # Example
    ///
    /// ```
    /// use lidarcam_image::ChannelOrder;
    ///
    /// assert_eq!(ChannelOrder::Rgb.permutation(), [0, 1, 2]);
    /// assert_eq!(ChannelOrder::Bgr.permutation(), [2, 1, 0]);
    /// ```
    pub const fn permutation(&self) -> [usize; 3] {
        match self {
            ChannelOrder::Rgb => [0, 1, 2],
            ChannelOrder::Bgr => [2, 1, 0],
        }
    }

    /// Reorder a raw pixel stored in this order into red-green-blue order.
    #[inline]
    pub fn to_rgb(&self, pixel: [u8; 3]) -> [u8; 3] {
        let [r, g, b] = self.permutation();
        [pixel[r], pixel[g], pixel[b]]
    }

    /// Reorder a raw pixel into red-green-blue order and normalize it to [0, 1].
    ///
    /// This is the only place where the channel permutation and the 0-255 scaling happen.
    ///
    /// # Example
    ///
    /// ```
    /// use lidarcam_image::ChannelOrder;
    ///
    /// let rgb = ChannelOrder::Bgr.to_rgb_normalized([0, 0, 255]);
    /// assert_eq!(rgb, [1.0, 0.0, 0.0]);
    /// ```
    #[inline]
    pub fn to_rgb_normalized(&self, pixel: [u8; 3]) -> [f64; 3] {
        self.to_rgb(pixel).map(|c| c as f64 / U8_MAX)
    }
}

impl std::fmt::Display for ChannelOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            ChannelOrder::Rgb => write!(f, "rgb"),
            ChannelOrder::Bgr => write!(f, "bgr"),
        }
    }
}
