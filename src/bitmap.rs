use image::{imageops, DynamicImage, GenericImageView, GrayImage, Rgba, RgbImage, RgbaImage};

/// Monochrome label image as seen by the encoder.
///
/// `x` runs along the tape, `y` across it from the top edge. A pixel is ink
/// when it is anything but pure white.
pub trait LabelBitmap {
    fn width(&self) -> u32;
    fn height(&self) -> u32;
    fn is_ink(&self, x: u32, y: u32) -> bool;
}

impl<B: LabelBitmap + ?Sized> LabelBitmap for &B {
    fn width(&self) -> u32 {
        (**self).width()
    }

    fn height(&self) -> u32 {
        (**self).height()
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        (**self).is_ink(x, y)
    }
}

/// Owned 1-bit image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bitmap {
    width: u32,
    height: u32,
    pixels: Vec<bool>,
}

impl Bitmap {
    /// Blank (all white) bitmap.
    pub fn new(width: u32, height: u32) -> Self {
        Bitmap {
            width,
            height,
            pixels: vec![false; width as usize * height as usize],
        }
    }

    pub fn from_fn(width: u32, height: u32, f: impl Fn(u32, u32) -> bool) -> Self {
        let mut bitmap = Bitmap::new(width, height);
        for y in 0..height {
            for x in 0..width {
                bitmap.set(x, y, f(x, y));
            }
        }
        bitmap
    }

    /// Threshold 8-bit grayscale samples, row-major, into ink and paper.
    ///
    /// Samples at or below `threshold` become ink. Missing samples are white.
    pub fn from_luma(width: u32, height: u32, threshold: u8, bytes: &[u8]) -> Self {
        Bitmap::from_fn(width, height, |x, y| {
            bytes
                .get(index(width, x, y))
                .map_or(false, |pixel| *pixel <= threshold)
        })
    }

    /// Reduce any image to 1-bit.
    ///
    /// The image is drawn over a white canvas, so transparency reads as
    /// paper, converted to 8-bit luma and cut at `threshold` like
    /// [`Bitmap::from_luma`].
    pub fn from_image(image: &DynamicImage, threshold: u8) -> Self {
        let (width, height) = image.dimensions();
        let mut canvas = RgbaImage::from_pixel(width, height, Rgba([0xFF, 0xFF, 0xFF, 0xFF]));
        imageops::overlay(&mut canvas, &image.to_rgba8(), 0, 0);
        let gray = DynamicImage::ImageRgba8(canvas).to_luma8();
        Bitmap::from_luma(width, height, threshold, gray.as_raw())
    }

    /// Set one pixel. Coordinates outside the bitmap are ignored.
    pub fn set(&mut self, x: u32, y: u32, ink: bool) {
        if x < self.width && y < self.height {
            self.pixels[index(self.width, x, y)] = ink;
        }
    }
}

impl LabelBitmap for Bitmap {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        self.pixels[index(self.width, x, y)]
    }
}

impl LabelBitmap for GrayImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        self.get_pixel(x, y).0 != [0xFF]
    }
}

impl LabelBitmap for RgbImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        self.get_pixel(x, y).0 != [0xFF, 0xFF, 0xFF]
    }
}

impl LabelBitmap for RgbaImage {
    fn width(&self) -> u32 {
        self.dimensions().0
    }

    fn height(&self) -> u32 {
        self.dimensions().1
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        is_ink_rgba(self.get_pixel(x, y).0)
    }
}

impl LabelBitmap for DynamicImage {
    fn width(&self) -> u32 {
        GenericImageView::width(self)
    }

    fn height(&self) -> u32 {
        GenericImageView::height(self)
    }

    fn is_ink(&self, x: u32, y: u32) -> bool {
        is_ink_rgba(GenericImageView::get_pixel(self, x, y).0)
    }
}

fn index(width: u32, x: u32, y: u32) -> usize {
    y as usize * width as usize + x as usize
}

// Transparent pixels are drawn over a white background.
fn is_ink_rgba([r, g, b, a]: [u8; 4]) -> bool {
    a != 0 && [r, g, b] != [0xFF, 0xFF, 0xFF]
}
