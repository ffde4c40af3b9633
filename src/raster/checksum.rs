use crate::errors::*;
use crate::raster::RasterBand;

const PRIMES: [i32; 11] = [7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43];

/// Compute a 16-bit checksum of a region of `band`, the way `GDALChecksumImage` does.
///
/// Pixels are read as `i32` (floating point values are rounded) and each one adds its
/// remainder by a cycling list of small primes. The whole band is used when `window`
/// is `None`, otherwise `window` is `((x, y), (width, height))` and must lie inside the band.
///
/// # Example
///
/// ```rust
/// # fn main() -> georaster::errors::Result<()> {
/// use georaster::raster::checksum_image;
/// use georaster::Dataset;
///
/// let dataset = Dataset::create_with_band_type::<u8>(4, 4, 1)?;
/// let mut band = dataset.rasterband(1)?;
/// assert_eq!(checksum_image(&band, None)?, 0);
/// band.fill(100.0)?;
/// assert_ne!(checksum_image(&band, None)?, 0);
/// # Ok(())
/// # }
/// ```
pub fn checksum_image(
    band: &RasterBand,
    window: Option<((isize, isize), (usize, usize))>,
) -> Result<u16> {
    let band_size = band.size()?;
    let ((x, y), (width, height)) = window.unwrap_or(((0, 0), band_size));
    if x < 0
        || y < 0
        || width == 0
        || height == 0
        || x as usize + width > band_size.0
        || y as usize + height > band_size.1
    {
        return Err(RasterError::OutOfBounds {
            x,
            y,
            width,
            height,
            raster_size: band_size,
        });
    }

    let mut checksum: i64 = 0;
    let mut prime = 0;
    for line in 0..height as isize {
        let row = band.read_as::<i32>((x, y + line), (width, 1), (width, 1), None)?;
        for value in row.data {
            checksum += i64::from(value % PRIMES[prime]);
            prime = (prime + 1) % PRIMES.len();
            checksum &= 0xffff;
        }
    }
    Ok(checksum as u16)
}
