//! Equal-area sky pixelization (ring-ordered HEALPix scheme).
//!
//! Pixels are indexed ring by ring from the north pole. The sphere splits
//! into a north polar cap (rings 1..nside-1 with 4*i pixels each), an
//! equatorial belt (rings nside..3*nside with 4*nside pixels each), and a
//! mirrored south cap. All cells have area 4*pi / (12*nside^2).
//!
//! Angles follow the usual convention: `theta` is colatitude in [0, pi]
//! (0 at the north pole) and `phi` is longitude in [0, 2*pi).

use nalgebra::Vector3;
use std::f64::consts::{FRAC_PI_2, PI};
use thiserror::Error;

const TWO_PI: f64 = 2.0 * PI;

#[derive(Debug, Error)]
pub enum PixelizationError {
    #[error("nside must be at least 1, got {0}")]
    InvalidNside(u32),
    #[error("pixel index {index} out of range for {npix} pixels")]
    PixelOutOfRange { index: usize, npix: usize },
}

/// Equal-area pixelization of the sphere at a fixed resolution.
///
/// `nside` controls the resolution: the sphere holds `12 * nside^2`
/// pixels. `nside = 1` gives the 12-cell base partition used for the
/// coarse rate weights; detection maps typically use `nside = 16`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pixelization {
    nside: u32,
}

impl Pixelization {
    pub fn new(nside: u32) -> Result<Self, PixelizationError> {
        if nside == 0 {
            return Err(PixelizationError::InvalidNside(nside));
        }
        Ok(Self { nside })
    }

    pub fn nside(&self) -> u32 {
        self.nside
    }

    /// Total number of pixels, `12 * nside^2`.
    pub fn npix(&self) -> usize {
        12 * (self.nside as usize) * (self.nside as usize)
    }

    /// Solid angle of a single pixel in steradians.
    pub fn pixel_area(&self) -> f64 {
        4.0 * PI / self.npix() as f64
    }

    /// Number of pixels in the two polar caps combined, `2 * 2n(n-1)`.
    fn ncap(&self) -> usize {
        let n = self.nside as usize;
        2 * n * (n - 1)
    }

    /// Colatitude and longitude of a pixel center.
    pub fn pixel_to_angles(&self, pix: usize) -> Result<(f64, f64), PixelizationError> {
        let npix = self.npix();
        if pix >= npix {
            return Err(PixelizationError::PixelOutOfRange { index: pix, npix });
        }
        let n = self.nside as f64;
        let ncap = self.ncap();

        if pix < ncap {
            // North polar cap
            let hip = (pix + 1) as f64 / 2.0;
            let iring = (hip - hip.floor().sqrt()).sqrt().floor() as usize + 1;
            let iphi = pix + 1 - 2 * iring * (iring - 1);
            let z = 1.0 - (iring * iring) as f64 / (3.0 * n * n);
            let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
            Ok((z.acos(), phi))
        } else if pix < npix - ncap {
            // Equatorial belt
            let nl4 = 4 * self.nside as usize;
            let ip = pix - ncap;
            let iring = ip / nl4 + self.nside as usize;
            let iphi = ip % nl4 + 1;
            // Odd rings are shifted by half a cell in phi
            let fodd = if (iring + self.nside as usize) % 2 == 1 {
                1.0
            } else {
                0.5
            };
            let z = (2.0 * n - iring as f64) * 2.0 / (3.0 * n);
            let phi = (iphi as f64 - fodd) * FRAC_PI_2 / n;
            Ok((z.acos(), phi))
        } else {
            // South polar cap, mirror of the north
            let ip = npix - pix;
            let hip = ip as f64 / 2.0;
            let iring = (hip - hip.floor().sqrt()).sqrt().floor() as usize + 1;
            let iphi = 4 * iring + 1 - (ip - 2 * iring * (iring - 1));
            let z = -1.0 + (iring * iring) as f64 / (3.0 * n * n);
            let phi = (iphi as f64 - 0.5) * FRAC_PI_2 / iring as f64;
            Ok((z.acos(), phi))
        }
    }

    /// Index of the pixel containing the direction (`theta`, `phi`).
    pub fn angles_to_pixel(&self, theta: f64, phi: f64) -> usize {
        let n = self.nside as f64;
        let z = theta.cos();
        let za = z.abs();
        let tt = (phi.rem_euclid(TWO_PI)) / FRAC_PI_2; // in [0, 4)

        if za <= 2.0 / 3.0 {
            // Equatorial belt
            let temp1 = n * (0.5 + tt);
            let temp2 = n * z * 0.75;
            let jp = (temp1 - temp2).floor() as i64;
            let jm = (temp1 + temp2).floor() as i64;

            let ir = self.nside as i64 + 1 + jp - jm; // ring counted from z = 2/3
            let kshift = 1 - (ir & 1); // 1 for even rings
            let nl4 = 4 * self.nside as i64;
            let ip = ((jp + jm - self.nside as i64 + kshift + 1) / 2).rem_euclid(nl4);
            (self.ncap() as i64 + (ir - 1) * nl4 + ip) as usize
        } else {
            // Polar caps
            let tp = tt - tt.floor();
            let tmp = n * (3.0 * (1.0 - za)).sqrt();
            let jp = (tp * tmp) as i64;
            let jm = ((1.0 - tp) * tmp) as i64;

            let ir = jp + jm + 1; // ring counted from the nearest pole
            let ip = ((tt * ir as f64) as i64).rem_euclid(4 * ir);
            if z > 0.0 {
                (2 * ir * (ir - 1) + ip) as usize
            } else {
                (self.npix() as i64 - 2 * ir * (ir + 1) + ip) as usize
            }
        }
    }

    /// Unit vector toward a pixel center.
    pub fn pixel_to_vector(&self, pix: usize) -> Result<Vector3<f64>, PixelizationError> {
        let (theta, phi) = self.pixel_to_angles(pix)?;
        Ok(angles_to_vector(theta, phi))
    }

    /// Index of the pixel containing a direction vector (need not be unit).
    pub fn vector_to_pixel(&self, v: &Vector3<f64>) -> usize {
        let norm = v.norm();
        let theta = (v.z / norm).clamp(-1.0, 1.0).acos();
        let phi = v.y.atan2(v.x).rem_euclid(TWO_PI);
        self.angles_to_pixel(theta, phi)
    }

    /// Unit vectors toward every pixel center, in pixel order.
    pub fn pixel_centers(&self) -> Vec<Vector3<f64>> {
        (0..self.npix())
            .map(|p| self.pixel_to_vector(p).expect("pixel index in range"))
            .collect()
    }

    /// Ring layout: first pixel index, pixel count, center colatitude and
    /// the phi offset of the first center in units of the ring's cell width.
    fn ring_info(&self, ring: usize) -> (usize, usize, f64, f64) {
        let n = self.nside as usize;
        let nf = n as f64;
        if ring < n {
            // north cap
            let start = 2 * ring * (ring - 1);
            let count = 4 * ring;
            let z = 1.0 - (ring * ring) as f64 / (3.0 * nf * nf);
            (start, count, z.acos(), 0.5)
        } else if ring <= 3 * n {
            let start = self.ncap() + (ring - n) * 4 * n;
            let count = 4 * n;
            let z = (2.0 * nf - ring as f64) * 2.0 / (3.0 * nf);
            let shift = if (ring + n) % 2 == 1 { 0.0 } else { 0.5 };
            (start, count, z.acos(), shift)
        } else {
            let south = 4 * n - ring;
            let start = self.npix() - 2 * south * (south + 1);
            let count = 4 * south;
            let z = -1.0 + (south * south) as f64 / (3.0 * nf * nf);
            (start, count, z.acos(), 0.5)
        }
    }

    /// Index of the ring whose center colatitude is at or above `z`
    /// (0 means the direction lies poleward of the first ring).
    fn ring_above(&self, z: f64) -> usize {
        let n = self.nside as f64;
        let za = z.abs();
        if za <= 2.0 / 3.0 {
            (n * (2.0 - 1.5 * z)) as usize
        } else {
            let iring = (n * (3.0 * (1.0 - za)).sqrt()) as usize;
            if z > 0.0 {
                iring
            } else {
                4 * self.nside as usize - iring - 1
            }
        }
    }

    /// Value of the ring-interpolated map at longitude `phi` on one ring.
    fn ring_interp(&self, map: &[f64], ring: usize, phi: f64) -> f64 {
        let (start, count, _, shift) = self.ring_info(ring);
        let dphi = TWO_PI / count as f64;
        let t = phi.rem_euclid(TWO_PI) / dphi - shift;
        let j0 = t.floor();
        let frac = t - j0;
        let p0 = (j0 as i64).rem_euclid(count as i64) as usize;
        let p1 = (p0 + 1) % count;
        (1.0 - frac) * map[start + p0] + frac * map[start + p1]
    }

    /// Bilinear interpolation of a full-sky map at (`theta`, `phi`).
    ///
    /// Brackets the direction between the two nearest iso-latitude rings,
    /// interpolates along each ring in longitude (with wrap-around), then
    /// linearly in colatitude between the rings. Directions poleward of
    /// the first or last ring clamp onto that ring.
    ///
    /// # Panics
    /// Panics if `map.len() != self.npix()`.
    pub fn interpolate_map(&self, map: &[f64], theta: f64, phi: f64) -> f64 {
        assert_eq!(map.len(), self.npix(), "map length must match pixelization");
        let nrings = 4 * self.nside as usize - 1;
        let z = theta.cos();
        let r1 = self.ring_above(z);

        if r1 == 0 {
            return self.ring_interp(map, 1, phi);
        }
        if r1 >= nrings {
            return self.ring_interp(map, nrings, phi);
        }
        let (_, _, theta1, _) = self.ring_info(r1);
        let (_, _, theta2, _) = self.ring_info(r1 + 1);
        let w = ((theta - theta1) / (theta2 - theta1)).clamp(0.0, 1.0);
        (1.0 - w) * self.ring_interp(map, r1, phi) + w * self.ring_interp(map, r1 + 1, phi)
    }
}

/// Unit vector from colatitude and longitude.
pub fn angles_to_vector(theta: f64, phi: f64) -> Vector3<f64> {
    let st = theta.sin();
    Vector3::new(st * phi.cos(), st * phi.sin(), theta.cos())
}
