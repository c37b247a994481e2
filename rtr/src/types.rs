// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use std::cmp::Ordering;
use std::fmt::{self, Display, Formatter};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct Prefix4 {
    pub value: Ipv4Addr,
    pub length: u8,
}

impl PartialOrd for Prefix4 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Prefix4 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl Prefix4 {
    pub const HOST_MASK: u8 = 32;

    /// Create a new `Prefix4` from an IP address and net mask. Host bits are
    /// zeroed.
    /// ```
    /// use rtr::types::Prefix4;
    /// use std::net::Ipv4Addr;
    /// let p4 = Prefix4::new(Ipv4Addr::new(10, 0, 0, 10), 24).unwrap();
    /// assert_eq!(p4.value, Ipv4Addr::new(10, 0, 0, 0));
    /// ```
    pub fn new(ip: Ipv4Addr, length: u8) -> Result<Self, Error> {
        if length > Self::HOST_MASK {
            return Err(Error::InvalidPrefix(format!("{ip}/{length}")));
        }
        let mut new = Self { value: ip, length };
        new.unset_host_bits();
        Ok(new)
    }

    pub fn unset_host_bits(&mut self) {
        let mask = match self.length {
            0 => 0,
            _ => (!0u32) << (32 - self.length),
        };
        self.value = Ipv4Addr::from(u32::from(self.value) & mask)
    }
}

impl Display for Prefix4 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix4 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) = split_prefix(s)?;
        let value = value
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        Self::new(value, length)
    }
}

#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq)]
pub struct Prefix6 {
    pub value: Ipv6Addr,
    pub length: u8,
}

impl PartialOrd for Prefix6 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Prefix6 {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.value != other.value {
            return self.value.cmp(&other.value);
        }
        self.length.cmp(&other.length)
    }
}

impl Prefix6 {
    pub const HOST_MASK: u8 = 128;

    /// Create a new `Prefix6` from an IP address and net mask. Host bits are
    /// zeroed.
    /// ```
    /// use rtr::types::Prefix6;
    /// use std::net::Ipv6Addr;
    /// let p6 = Prefix6::new("2001:db8::1".parse().unwrap(), 64).unwrap();
    /// assert_eq!(p6.value, "2001:db8::".parse::<Ipv6Addr>().unwrap());
    /// ```
    pub fn new(ip: Ipv6Addr, length: u8) -> Result<Self, Error> {
        if length > Self::HOST_MASK {
            return Err(Error::InvalidPrefix(format!("{ip}/{length}")));
        }
        let mut new = Self { value: ip, length };
        new.unset_host_bits();
        Ok(new)
    }

    pub fn unset_host_bits(&mut self) {
        let mask = match self.length {
            0 => 0,
            _ => (!0u128) << (128 - self.length),
        };
        self.value = Ipv6Addr::from(u128::from(self.value) & mask)
    }
}

impl Display for Prefix6 {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.length)
    }
}

impl FromStr for Prefix6 {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) = split_prefix(s)?;
        let value = value
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        Self::new(value, length)
    }
}

fn split_prefix(s: &str) -> Result<(&str, u8), Error> {
    let (value, length) = s
        .split_once('/')
        .ok_or_else(|| Error::InvalidPrefix(s.to_string()))?;
    let length = length
        .parse()
        .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
    Ok((value, length))
}

/// An IPv4 or IPv6 prefix. IPv4 prefixes order before IPv6 prefixes.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub enum Prefix {
    V4(Prefix4),
    V6(Prefix6),
}

impl Prefix {
    pub fn new(ip: IpAddr, length: u8) -> Result<Self, Error> {
        match ip {
            IpAddr::V4(ip) => Ok(Self::V4(Prefix4::new(ip, length)?)),
            IpAddr::V6(ip) => Ok(Self::V6(Prefix6::new(ip, length)?)),
        }
    }

    pub fn length(&self) -> u8 {
        match self {
            Self::V4(p) => p.length,
            Self::V6(p) => p.length,
        }
    }

    /// Number of bits in an address of this prefix's family.
    pub fn host_mask(&self) -> u8 {
        match self {
            Self::V4(_) => Prefix4::HOST_MASK,
            Self::V6(_) => Prefix6::HOST_MASK,
        }
    }

    pub fn is_v4(&self) -> bool {
        matches!(self, Self::V4(_))
    }
}

impl Display for Prefix {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::V4(p) => p.fmt(f),
            Self::V6(p) => p.fmt(f),
        }
    }
}

impl FromStr for Prefix {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (value, length) = split_prefix(s)?;
        let value: IpAddr = value
            .parse()
            .map_err(|_| Error::InvalidPrefix(s.to_string()))?;
        Self::new(value, length)
    }
}

impl From<Prefix4> for Prefix {
    fn from(p: Prefix4) -> Self {
        Self::V4(p)
    }
}

impl From<Prefix6> for Prefix {
    fn from(p: Prefix6) -> Self {
        Self::V6(p)
    }
}

/// A validated route origin authorization: `origin_asn` may originate
/// `prefix` and any more specific prefix up to `max_length` bits.
#[derive(Debug, Copy, Clone, Eq, Hash, PartialEq, PartialOrd, Ord)]
pub struct Roa {
    prefix: Prefix,
    max_length: u8,
    origin_asn: u32,
}

impl Roa {
    pub fn new(
        prefix: Prefix,
        max_length: u8,
        origin_asn: u32,
    ) -> Result<Self, Error> {
        if prefix.length() > max_length || max_length > prefix.host_mask() {
            return Err(Error::InvalidRoa(format!(
                "{prefix} max length {max_length} AS{origin_asn}"
            )));
        }
        Ok(Self {
            prefix,
            max_length,
            origin_asn,
        })
    }

    pub fn prefix(&self) -> Prefix {
        self.prefix
    }

    pub fn max_length(&self) -> u8 {
        self.max_length
    }

    pub fn origin_asn(&self) -> u32 {
        self.origin_asn
    }
}

impl Display for Roa {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{} AS{}",
            self.prefix, self.max_length, self.origin_asn
        )
    }
}
