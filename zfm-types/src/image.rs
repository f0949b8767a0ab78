//! Fingerprint images
//!
//! The sensor moves images over the wire at 4 bits per pixel, two pixels per
//! byte with the left pixel in the high nibble. [`FingerprintImage`] holds
//! the expanded 8-bit grayscale form and converts to and from uncompressed
//! 8-bit paletted BMP files.

use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::error::{Error, Result};

const FILE_HEADER_SIZE: u32 = 14;
const INFO_HEADER_SIZE: u32 = 40;
const PALETTE_SIZE: u32 = 256 * 4;

/// Grayscale fingerprint image at sensor resolution
#[derive(Clone, PartialEq, Eq)]
pub struct FingerprintImage {
    pixels: Vec<u8>,
}

impl FingerprintImage {
    /// Image width in pixels
    pub const WIDTH: usize = 256;

    /// Image height in pixels
    pub const HEIGHT: usize = 288;

    /// Size of the packed wire form in bytes
    pub const PACKED_SIZE: usize = Self::WIDTH * Self::HEIGHT / 2;

    /// Build an image from row-major 8-bit pixels
    pub fn new(pixels: Vec<u8>) -> Result<Self> {
        if pixels.len() != Self::WIDTH * Self::HEIGHT {
            return Err(Error::Validation(format!(
                "expected {} pixels, got {}",
                Self::WIDTH * Self::HEIGHT,
                pixels.len()
            )));
        }

        Ok(Self { pixels })
    }

    /// Expand the packed 4-bit wire form
    pub fn from_packed(packed: &[u8]) -> Result<Self> {
        if packed.len() != Self::PACKED_SIZE {
            return Err(Error::Validation(format!(
                "packed image must be {} bytes, got {}",
                Self::PACKED_SIZE,
                packed.len()
            )));
        }

        let pixels = packed
            .iter()
            .flat_map(|&b| [(b >> 4) * 17, (b & 0x0F) * 17])
            .collect();

        Ok(Self { pixels })
    }

    /// Pack into the 4-bit wire form, keeping the high nibble of each pixel
    pub fn to_packed(&self) -> Vec<u8> {
        self.pixels
            .chunks_exact(2)
            .map(|pair| (pair[0] & 0xF0) | (pair[1] >> 4))
            .collect()
    }

    /// Row-major pixel data
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Pixel at column `x`, row `y` (origin at top left)
    pub fn pixel(&self, x: usize, y: usize) -> Option<u8> {
        if x >= Self::WIDTH || y >= Self::HEIGHT {
            return None;
        }
        Some(self.pixels[y * Self::WIDTH + x])
    }

    /// Write as an 8-bit grayscale BMP
    pub fn write_bmp<W: Write>(&self, mut w: W) -> Result<()> {
        let row_size = bmp_row_size(Self::WIDTH);
        let image_size = (row_size * Self::HEIGHT) as u32;
        let data_offset = FILE_HEADER_SIZE + INFO_HEADER_SIZE + PALETTE_SIZE;

        w.write_all(b"BM")?;
        w.write_u32::<LittleEndian>(data_offset + image_size)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(data_offset)?;

        w.write_u32::<LittleEndian>(INFO_HEADER_SIZE)?;
        w.write_i32::<LittleEndian>(Self::WIDTH as i32)?;
        w.write_i32::<LittleEndian>(Self::HEIGHT as i32)?;
        w.write_u16::<LittleEndian>(1)?;
        w.write_u16::<LittleEndian>(8)?;
        w.write_u32::<LittleEndian>(0)?;
        w.write_u32::<LittleEndian>(image_size)?;
        // 500 dpi
        w.write_i32::<LittleEndian>(19_685)?;
        w.write_i32::<LittleEndian>(19_685)?;
        w.write_u32::<LittleEndian>(256)?;
        w.write_u32::<LittleEndian>(256)?;

        for level in 0..=255u8 {
            w.write_all(&[level, level, level, 0])?;
        }

        let padding = vec![0u8; row_size - Self::WIDTH];
        for row in self.pixels.chunks_exact(Self::WIDTH).rev() {
            w.write_all(row)?;
            w.write_all(&padding)?;
        }

        w.flush()?;
        Ok(())
    }

    /// Read an uncompressed 8-bit paletted BMP at sensor resolution
    ///
    /// Palette entries are converted to gray by averaging their channels.
    pub fn read_bmp<R: Read>(mut r: R) -> Result<Self> {
        let mut magic = [0u8; 2];
        r.read_exact(&mut magic)?;
        if &magic != b"BM" {
            return Err(Error::Parse("not a BMP file".into()));
        }

        let _file_size = r.read_u32::<LittleEndian>()?;
        let _reserved = r.read_u32::<LittleEndian>()?;
        let data_offset = r.read_u32::<LittleEndian>()?;

        let info_size = r.read_u32::<LittleEndian>()?;
        if info_size < INFO_HEADER_SIZE {
            return Err(Error::Parse(format!("unsupported BMP header size {}", info_size)));
        }

        let width = r.read_i32::<LittleEndian>()?;
        let height = r.read_i32::<LittleEndian>()?;
        let _planes = r.read_u16::<LittleEndian>()?;
        let bits_per_pixel = r.read_u16::<LittleEndian>()?;
        let compression = r.read_u32::<LittleEndian>()?;
        let _image_size = r.read_u32::<LittleEndian>()?;
        let _x_resolution = r.read_i32::<LittleEndian>()?;
        let _y_resolution = r.read_i32::<LittleEndian>()?;
        let colors_used = r.read_u32::<LittleEndian>()?;
        let _colors_important = r.read_u32::<LittleEndian>()?;
        skip(&mut r, u64::from(info_size - INFO_HEADER_SIZE))?;

        if bits_per_pixel != 8 || compression != 0 {
            return Err(Error::Parse(format!(
                "only uncompressed 8-bit BMP is supported (got {} bpp, compression {})",
                bits_per_pixel, compression
            )));
        }

        let top_down = height < 0;
        if width.unsigned_abs() as usize != Self::WIDTH
            || height.unsigned_abs() as usize != Self::HEIGHT
        {
            return Err(Error::Validation(format!(
                "image must be {}x{}, got {}x{}",
                Self::WIDTH,
                Self::HEIGHT,
                width,
                height.unsigned_abs()
            )));
        }

        let colors = match colors_used {
            0 => 256,
            n if n <= 256 => n as usize,
            n => return Err(Error::Parse(format!("palette of {} colors", n))),
        };
        let mut palette = [0u8; 256];
        for entry in palette.iter_mut().take(colors) {
            let mut bgra = [0u8; 4];
            r.read_exact(&mut bgra)?;
            *entry = ((u16::from(bgra[0]) + u16::from(bgra[1]) + u16::from(bgra[2])) / 3) as u8;
        }

        let consumed = FILE_HEADER_SIZE + info_size + colors as u32 * 4;
        let gap = data_offset.checked_sub(consumed).ok_or_else(|| {
            Error::Parse(format!("pixel data offset {} overlaps headers", data_offset))
        })?;
        skip(&mut r, u64::from(gap))?;

        let row_size = bmp_row_size(Self::WIDTH);
        let mut row = vec![0u8; row_size];
        let mut pixels = vec![0u8; Self::WIDTH * Self::HEIGHT];

        for i in 0..Self::HEIGHT {
            r.read_exact(&mut row)?;
            let y = if top_down { i } else { Self::HEIGHT - 1 - i };
            let dest = &mut pixels[y * Self::WIDTH..(y + 1) * Self::WIDTH];
            for (px, &index) in dest.iter_mut().zip(&row[..Self::WIDTH]) {
                *px = palette[usize::from(index)];
            }
        }

        Ok(Self { pixels })
    }

    /// Save as a BMP file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = File::create(path)?;
        self.write_bmp(BufWriter::new(file))
    }

    /// Load a BMP file
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::read_bmp(BufReader::new(file))
    }
}

impl std::fmt::Debug for FingerprintImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FingerprintImage")
            .field("width", &Self::WIDTH)
            .field("height", &Self::HEIGHT)
            .finish_non_exhaustive()
    }
}

fn bmp_row_size(width: usize) -> usize {
    (width + 3) & !3
}

fn skip<R: Read>(r: &mut R, n: u64) -> io::Result<()> {
    let copied = io::copy(&mut r.by_ref().take(n), &mut io::sink())?;
    if copied < n {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gradient() -> FingerprintImage {
        let pixels = (0..FingerprintImage::WIDTH * FingerprintImage::HEIGHT)
            .map(|i| ((i % FingerprintImage::WIDTH) as u8) & 0xF0)
            .collect();
        FingerprintImage::new(pixels).unwrap()
    }

    #[test]
    fn test_unpack_nibbles() {
        let mut packed = vec![0u8; FingerprintImage::PACKED_SIZE];
        packed[0] = 0xF0;
        packed[1] = 0x3A;

        let image = FingerprintImage::from_packed(&packed).unwrap();

        assert_eq!(image.pixel(0, 0), Some(255));
        assert_eq!(image.pixel(1, 0), Some(0));
        assert_eq!(image.pixel(2, 0), Some(0x33));
        assert_eq!(image.pixel(3, 0), Some(0xAA));
        assert_eq!(image.to_packed(), packed);
    }

    #[test]
    fn test_pack_drops_low_nibble() {
        let mut pixels = vec![0u8; FingerprintImage::WIDTH * FingerprintImage::HEIGHT];
        pixels[0] = 0x9F;
        pixels[1] = 0x41;

        let image = FingerprintImage::new(pixels).unwrap();
        assert_eq!(image.to_packed()[0], 0x94);
    }

    #[test]
    fn test_wrong_sizes() {
        assert!(FingerprintImage::from_packed(&[0u8; 100]).is_err());
        assert!(FingerprintImage::new(vec![0u8; 10]).is_err());
        assert_eq!(gradient().pixel(256, 0), None);
    }

    #[test]
    fn test_bmp_layout() {
        let mut out = Vec::new();
        gradient().write_bmp(&mut out).unwrap();

        assert_eq!(&out[..2], b"BM");
        assert_eq!(out.len(), 14 + 40 + 1024 + 256 * 288);
        // Bottom row is written first
        assert_eq!(out[14 + 40 + 1024 + 16], 0x10);
    }

    #[test]
    fn test_bmp_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("finger.bmp");
        let image = gradient();

        image.save(&path).unwrap();
        let loaded = FingerprintImage::open(&path).unwrap();

        assert_eq!(loaded, image);
    }

    #[test]
    fn test_bmp_rejects_truecolor() {
        let mut out = Vec::new();
        gradient().write_bmp(&mut out).unwrap();
        out[28] = 24;

        assert!(matches!(
            FingerprintImage::read_bmp(&out[..]),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn test_bmp_rejects_other_dimensions() {
        let mut out = Vec::new();
        gradient().write_bmp(&mut out).unwrap();
        out[18] = 0x80;
        out[19] = 0x00;

        assert!(matches!(
            FingerprintImage::read_bmp(&out[..]),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn test_bmp_rejects_garbage() {
        assert!(FingerprintImage::read_bmp(&b"PNG..."[..]).is_err());
    }
}
