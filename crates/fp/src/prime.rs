use std::{
    fmt::{Debug, Display},
    hash::Hash,
    str::FromStr,
};

use serde::{de::Error, Deserialize, Deserializer, Serialize, Serializer};

pub const TWO: ValidPrime = ValidPrime::new(2);

/// The characteristic of a field of coefficients. Boundary columns are reduced over any type
/// implementing this: the runtime prime [`ValidPrime`], or one of the unit types [`P2`] and
/// [`P3`] whose value is known at compile time.
pub trait Prime:
    Debug + Clone + Copy + Display + Hash + Eq + PartialEq<u32> + Send + Sync + 'static
{
    fn as_u32(self) -> u32;
    fn to_dyn(self) -> ValidPrime;

    /// The representative of `n` in `0..p`.
    fn reduce(self, n: i64) -> u32 {
        n.rem_euclid(i64::from(self.as_u32())) as u32
    }

    /// `n1 + n2` in `0..p`. The inputs may be as large as `u32::MAX`.
    fn sum(self, n1: u32, n2: u32) -> u32 {
        ((u64::from(n1) + u64::from(n2)) % u64::from(self.as_u32())) as u32
    }

    /// `n1 * n2` in `0..p`. The inputs may be as large as `u32::MAX`.
    fn product(self, n1: u32, n2: u32) -> u32 {
        ((u64::from(n1) * u64::from(n2)) % u64::from(self.as_u32())) as u32
    }

    fn neg(self, n: u32) -> u32 {
        if n == 0 {
            0
        } else {
            self.as_u32() - n
        }
    }

    /// The multiplicative inverse of a nonzero `k < p`, by the extended Euclidean algorithm.
    fn inverse(self, k: u32) -> u32 {
        debug_assert!(k > 0 && k < self.as_u32());
        if self == 2 {
            return 1;
        }
        let p = i64::from(self.as_u32());
        let (mut r0, mut r1) = (p, i64::from(k));
        let (mut t0, mut t1) = (0i64, 1i64);
        while r1 != 0 {
            let q = r0 / r1;
            (r0, r1) = (r1, r0 - q * r1);
            (t0, t1) = (t1, t0 - q * t1);
        }
        self.reduce(t0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimeError {
    NotAnInteger(std::num::ParseIntError),
    InvalidPrime(u32),
}

impl std::fmt::Display for PrimeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnInteger(s) => write!(f, "Not an integer: {s}"),
            Self::InvalidPrime(p) => write!(f, "{p} is not a valid prime"),
        }
    }
}

impl std::error::Error for PrimeError {}

macro_rules! static_prime {
    ($pn:ident, $p:literal) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $pn;

        impl Prime for $pn {
            #[inline]
            fn as_u32(self) -> u32 {
                $p
            }

            #[inline]
            fn to_dyn(self) -> ValidPrime {
                ValidPrime::new($p)
            }
        }

        impl PartialEq<u32> for $pn {
            fn eq(&self, other: &u32) -> bool {
                $p == *other
            }
        }

        impl Display for $pn {
            fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "{}", $p)
            }
        }
    };
}

static_prime!(P2, 2);
static_prime!(P3, 3);

/// A prime checked at runtime, as read from the command line or a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ValidPrime {
    p: u32,
}

pub const fn is_prime(p: u32) -> bool {
    if p < 2 {
        return false;
    }
    let mut k = 2;
    while (k as u64) * (k as u64) <= p as u64 {
        if p % k == 0 {
            return false;
        }
        k += 1;
    }
    true
}

impl ValidPrime {
    /// Panics if `p` is not a prime. Use [`ValidPrime::try_from`] for untrusted input.
    pub const fn new(p: u32) -> Self {
        // Entries are multiplied as u64, so p must fit comfortably in 32 bits.
        assert!(p < (1 << 31), "Tried to construct a prime larger than 2^31");
        assert!(is_prime(p), "Tried to construct a composite dynamic prime");
        Self { p }
    }
}

impl Prime for ValidPrime {
    fn as_u32(self) -> u32 {
        self.p
    }

    fn to_dyn(self) -> Self {
        self
    }
}

impl PartialEq<u32> for ValidPrime {
    fn eq(&self, other: &u32) -> bool {
        self.p == *other
    }
}

impl From<ValidPrime> for u32 {
    fn from(value: ValidPrime) -> u32 {
        value.p
    }
}

impl Display for ValidPrime {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        <u32 as Display>::fmt(&self.p, f)
    }
}

impl TryFrom<u32> for ValidPrime {
    type Error = PrimeError;

    fn try_from(p: u32) -> Result<Self, PrimeError> {
        if p < (1 << 31) && is_prime(p) {
            Ok(Self { p })
        } else {
            Err(PrimeError::InvalidPrime(p))
        }
    }
}

impl FromStr for ValidPrime {
    type Err = PrimeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let p: u32 = s.parse().map_err(PrimeError::NotAnInteger)?;
        Self::try_from(p)
    }
}

impl Serialize for ValidPrime {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.p.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidPrime {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let p: u32 = u32::deserialize(deserializer)?;
        Self::try_from(p).map_err(D::Error::custom)
    }
}

/// Small primes only: boundary matrices in tests are small, so small characteristics are the
/// interesting ones. The parameter is an exclusive upper bound and defaults to 32.
#[cfg(feature = "proptest")]
impl proptest::arbitrary::Arbitrary for ValidPrime {
    type Parameters = Option<u32>;
    type Strategy = proptest::sample::Select<Self>;

    fn arbitrary_with(max: Self::Parameters) -> Self::Strategy {
        let primes: Vec<Self> = (2..max.unwrap_or(32).max(3))
            .filter(|&p| is_prime(p))
            .map(|p| Self { p })
            .collect();
        proptest::sample::select(primes)
    }
}

#[cfg(test)]
mod tests {
    use expect_test::expect;
    use proptest::prelude::*;
    use rstest::rstest;

    use super::*;

    #[test]
    fn validprime_invalid() {
        assert_eq!(
            ValidPrime::try_from(4).unwrap_err(),
            PrimeError::InvalidPrime(4)
        );
        assert_eq!(
            "1".parse::<ValidPrime>().unwrap_err(),
            PrimeError::InvalidPrime(1)
        );
        assert_eq!(
            "2.5".parse::<ValidPrime>().unwrap_err(),
            PrimeError::NotAnInteger("2.5".parse::<u32>().unwrap_err())
        );
    }

    #[test]
    fn prime_error_display() {
        expect![["9 is not a valid prime"]].assert_eq(&PrimeError::InvalidPrime(9).to_string());
    }

    #[test]
    fn static_primes_agree() {
        assert_eq!(P2.to_dyn(), TWO);
        assert_eq!(P3.to_dyn(), ValidPrime::new(3));
        assert_eq!(P3.inverse(2), 2);
        assert_eq!(ValidPrime::new(7).inverse(3), 5);
    }

    #[test]
    fn serde_round_trip() {
        let p: ValidPrime = serde_json::from_str("7").unwrap();
        assert_eq!(p, 7);
        assert_eq!(serde_json::to_string(&p).unwrap(), "7");
        assert!(serde_json::from_str::<ValidPrime>("8").is_err());
    }

    #[rstest]
    #[case(2, 1, 0)]
    #[case(5, -1, 4)]
    #[case(7, -15, 6)]
    #[case(3, 10, 1)]
    fn reduce_signed(#[case] p: u32, #[case] n: i64, #[case] expected: u32) {
        assert_eq!(ValidPrime::new(p).reduce(n), expected);
    }

    proptest! {
        #[test]
        fn inverse_is_inverse(p: ValidPrime, k in 1u32..1000) {
            let k = k % p.as_u32();
            prop_assume!(k != 0);
            prop_assert_eq!(p.product(p.inverse(k), k), 1);
        }

        #[test]
        fn neg_is_additive_inverse(p: ValidPrime, k in 0u32..1000) {
            let k = k % p.as_u32();
            prop_assert_eq!(p.sum(p.neg(k), k), 0);
        }
    }
}
