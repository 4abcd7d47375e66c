use core::ops::{Add, AddAssign, Mul, MulAssign, Sub};

/// Sample type used through the whole decoding pipeline
pub type Scaler = f32;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Complex {
    pub r: Scaler,
    pub i: Scaler,
}

impl Complex {
    pub const fn new(r: Scaler, i: Scaler) -> Self {
        Self { r, i }
    }

    /// Unit vector at angle `theta` (radians), computed in double precision
    pub fn expi(theta: f64) -> Self {
        Self {
            r: theta.cos() as Scaler,
            i: theta.sin() as Scaler,
        }
    }

    pub fn conj(self) -> Self {
        Self { r: self.r, i: -self.i }
    }
}

impl Mul for Complex {
    type Output = Complex;
    fn mul(self, rhs: Complex) -> Self::Output {
        Complex {
            r: self.r * rhs.r - self.i * rhs.i,
            i: self.r * rhs.i + self.i * rhs.r,
        }
    }
}

impl Mul<Scaler> for Complex {
    type Output = Complex;
    fn mul(self, rhs: Scaler) -> Self::Output {
        Complex {
            r: self.r * rhs,
            i: self.i * rhs,
        }
    }
}

impl Add for Complex {
    type Output = Complex;
    fn add(self, rhs: Self) -> Self::Output {
        Complex {
            r: self.r + rhs.r,
            i: self.i + rhs.i,
        }
    }
}

impl Sub for Complex {
    type Output = Complex;
    fn sub(self, rhs: Self) -> Self::Output {
        Complex {
            r: self.r - rhs.r,
            i: self.i - rhs.i,
        }
    }
}

impl MulAssign<Scaler> for Complex {
    fn mul_assign(&mut self, rhs: Scaler) {
        self.r *= rhs;
        self.i *= rhs;
    }
}

impl AddAssign<Complex> for Complex {
    fn add_assign(&mut self, rhs: Complex) {
        self.r += rhs.r;
        self.i += rhs.i;
    }
}
