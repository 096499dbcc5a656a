//! Legacy Diffie-Hellman SASL mechanisms (DH-BLOWFISH, DH-AES).
//!
//! These are client-specific mechanisms with no published standard,
//! preserved bit-for-bit for interop with existing deployments. The
//! server's AUTHENTICATE challenge is a base64 blob of three
//! `u16`-big-endian length-prefixed fields: prime, generator, and the
//! server's public key. The client generates an ephemeral keypair,
//! derives the shared secret, and encrypts the password (Blowfish-ECB)
//! or `user NUL pass NUL` (AES-CBC) under it.
//!
//! Any parse or derivation failure is fail-closed: the caller aborts
//! the SASL round instead of transmitting a partial credential.

use aes::Aes256;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use blowfish::Blowfish;
use cipher::block_padding::NoPadding;
use cipher::generic_array::GenericArray;
use cipher::{BlockEncrypt, BlockEncryptMut, KeyInit, KeyIvInit};
use num_bigint::{BigUint, RandBigInt};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::error::DhError;

/// Upper bound on accepted prime size. Anything larger is either a
/// broken server or a resource-exhaustion attempt.
const MAX_PRIME_BITS: u64 = 4096;

/// Bits of ephemeral private-key entropy.
const PRIVATE_KEY_BITS: u64 = 256;

/// One parsed-and-completed DH exchange.
///
/// Ephemeral: exists only for the duration of a single AUTHENTICATE
/// round; the shared secret is zeroized on drop and never persisted.
pub struct DhExchange {
    public_key: Vec<u8>,
    secret: Zeroizing<Vec<u8>>,
}

impl DhExchange {
    /// Parse a server challenge and complete the key exchange.
    pub fn from_challenge(payload: &str) -> Result<Self, DhError> {
        let data = BASE64.decode(payload)?;
        let mut cursor = &data[..];
        let prime_bytes = read_prefixed(&mut cursor)?;
        let gen_bytes = read_prefixed(&mut cursor)?;
        let peer_bytes = read_prefixed(&mut cursor)?;

        let prime = BigUint::from_bytes_be(prime_bytes);
        let generator = BigUint::from_bytes_be(gen_bytes);
        let peer_public = BigUint::from_bytes_be(peer_bytes);

        if prime.bits() < 64 {
            return Err(DhError::InvalidParameter("prime too small"));
        }
        if prime.bits() > MAX_PRIME_BITS {
            return Err(DhError::InvalidParameter("prime too large"));
        }
        if generator < BigUint::from(2u8) {
            return Err(DhError::InvalidParameter("bad generator"));
        }
        if peer_public.bits() == 0 || peer_public >= prime {
            return Err(DhError::InvalidParameter("bad peer public key"));
        }

        let mut rng = rand::thread_rng();
        let private = rng.gen_biguint(PRIVATE_KEY_BITS);
        let public = generator.modpow(&private, &prime);
        let shared = peer_public.modpow(&private, &prime);

        // Fixed-width big-endian secret, left-padded to the prime's size
        let key_size = prime.to_bytes_be().len();
        let raw = shared.to_bytes_be();
        let mut secret = Zeroizing::new(vec![0u8; key_size]);
        secret[key_size - raw.len()..].copy_from_slice(&raw);

        Ok(DhExchange {
            public_key: public.to_bytes_be(),
            secret,
        })
    }

    /// Build the DH-BLOWFISH response.
    ///
    /// Layout: `len16(pub) || pub || user || NUL || ECB(password)`,
    /// base64-encoded, with the password NUL-padded to an 8-byte
    /// multiple (always at least one NUL so decryption can find the
    /// terminator).
    pub fn respond_blowfish(&self, username: &str, password: &str) -> Result<String, DhError> {
        let key_len = self.secret.len().min(56);
        if key_len < 4 {
            return Err(DhError::InvalidParameter("secret too short for blowfish"));
        }
        let cipher: Blowfish = Blowfish::new_from_slice(&self.secret[..key_len])
            .map_err(|_| DhError::InvalidParameter("blowfish key rejected"))?;

        let pass = password.as_bytes();
        let padded_len = pass.len() + (8 - pass.len() % 8);
        let mut plain = Zeroizing::new(vec![0u8; padded_len]);
        plain[..pass.len()].copy_from_slice(pass);

        let mut ciphertext = Vec::with_capacity(padded_len);
        for chunk in plain.chunks(8) {
            let mut block = GenericArray::clone_from_slice(chunk);
            cipher.encrypt_block(&mut block);
            ciphertext.extend_from_slice(&block);
        }

        let mut out = self.response_header();
        out.extend_from_slice(username.as_bytes());
        out.push(0);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&out))
    }

    /// Build the DH-AES response.
    ///
    /// Layout: `len16(pub) || pub || iv(16) || CBC(user NUL pass NUL
    /// random-pad)`, base64-encoded, plaintext padded to a 16-byte
    /// multiple with random bytes.
    pub fn respond_aes(&self, username: &str, password: &str) -> Result<String, DhError> {
        if self.secret.len() < 32 {
            return Err(DhError::InvalidParameter("secret too short for aes"));
        }
        let mut rng = rand::thread_rng();

        let mut plain = Zeroizing::new(Vec::with_capacity(username.len() + password.len() + 18));
        plain.extend_from_slice(username.as_bytes());
        plain.push(0);
        plain.extend_from_slice(password.as_bytes());
        plain.push(0);
        let rem = plain.len() % 16;
        if rem != 0 {
            let mut pad = vec![0u8; 16 - rem];
            rng.fill_bytes(&mut pad);
            plain.extend_from_slice(&pad);
        }

        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut iv);

        let enc = cbc::Encryptor::<Aes256>::new_from_slices(&self.secret[..32], &iv)
            .map_err(|_| DhError::InvalidParameter("aes key rejected"))?;
        let ciphertext = enc.encrypt_padded_vec_mut::<NoPadding>(&plain);

        let mut out = self.response_header();
        out.extend_from_slice(&iv);
        out.extend_from_slice(&ciphertext);
        Ok(BASE64.encode(&out))
    }

    /// `len16(pub) || pub` prefix shared by both response layouts.
    fn response_header(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(2 + self.public_key.len() + 64);
        out.extend_from_slice(&(self.public_key.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.public_key);
        out
    }

    /// The client's ephemeral public key (big-endian).
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }
}

/// Read one `u16`-BE length-prefixed field, advancing the cursor.
fn read_prefixed<'a>(cursor: &mut &'a [u8]) -> Result<&'a [u8], DhError> {
    if cursor.len() < 2 {
        return Err(DhError::ShortBuffer);
    }
    let len = u16::from_be_bytes([cursor[0], cursor[1]]) as usize;
    if cursor.len() < 2 + len {
        return Err(DhError::ShortBuffer);
    }
    let field = &cursor[2..2 + len];
    *cursor = &cursor[2 + len..];
    Ok(field)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cipher::{BlockDecrypt, BlockDecryptMut};

    /// 2^255 - 19, a convenient 32-byte prime for AES-sized secrets.
    fn prime_25519() -> BigUint {
        (BigUint::from(1u8) << 255) - BigUint::from(19u8)
    }

    fn make_challenge(prime: &BigUint, generator: u32, server_secret: u32) -> (String, BigUint) {
        let g = BigUint::from(generator);
        let b = BigUint::from(server_secret);
        let server_pub = g.modpow(&b, prime);
        let mut blob = Vec::new();
        for field in [prime.to_bytes_be(), g.to_bytes_be(), server_pub.to_bytes_be()] {
            blob.extend_from_slice(&(field.len() as u16).to_be_bytes());
            blob.extend_from_slice(&field);
        }
        (BASE64.encode(&blob), b)
    }

    /// Recompute the shared secret from the server's point of view.
    fn server_secret_bytes(prime: &BigUint, client_pub: &[u8], b: &BigUint) -> Vec<u8> {
        let a_pub = BigUint::from_bytes_be(client_pub);
        let shared = a_pub.modpow(b, prime);
        let key_size = prime.to_bytes_be().len();
        let raw = shared.to_bytes_be();
        let mut out = vec![0u8; key_size];
        out[key_size - raw.len()..].copy_from_slice(&raw);
        out
    }

    fn split_response(decoded: &[u8]) -> (&[u8], &[u8]) {
        let len = u16::from_be_bytes([decoded[0], decoded[1]]) as usize;
        (&decoded[2..2 + len], &decoded[2 + len..])
    }

    #[test]
    fn test_short_buffer_fails_closed() {
        let blob = BASE64.encode([0u8, 5, 1, 2]); // claims 5 bytes, has 2
        assert!(matches!(
            DhExchange::from_challenge(&blob),
            Err(DhError::ShortBuffer)
        ));
    }

    #[test]
    fn test_garbage_base64_fails_closed() {
        assert!(matches!(
            DhExchange::from_challenge("!!not base64!!"),
            Err(DhError::Base64(_))
        ));
    }

    #[test]
    fn test_zero_prime_rejected() {
        let mut blob = Vec::new();
        for field in [vec![0u8], vec![2u8], vec![1u8]] {
            blob.extend_from_slice(&(field.len() as u16).to_be_bytes());
            blob.extend_from_slice(&field);
        }
        assert!(DhExchange::from_challenge(&BASE64.encode(&blob)).is_err());
    }

    #[test]
    fn test_blowfish_roundtrip() {
        let prime = prime_25519();
        let (challenge, b) = make_challenge(&prime, 5, 0xC0FFEE);
        let ex = DhExchange::from_challenge(&challenge).unwrap();
        let resp = ex.respond_blowfish("alice", "sekrit").unwrap();

        let decoded = BASE64.decode(&resp).unwrap();
        let (client_pub, rest) = split_response(&decoded);
        let nul = rest.iter().position(|b| *b == 0).unwrap();
        assert_eq!(&rest[..nul], b"alice");
        let ciphertext = &rest[nul + 1..];
        assert_eq!(ciphertext.len() % 8, 0);

        let secret = server_secret_bytes(&prime, client_pub, &b);
        let cipher: Blowfish = Blowfish::new_from_slice(&secret[..secret.len().min(56)]).unwrap();
        let mut plain = Vec::new();
        for chunk in ciphertext.chunks(8) {
            let mut block = GenericArray::clone_from_slice(chunk);
            cipher.decrypt_block(&mut block);
            plain.extend_from_slice(&block);
        }
        assert!(plain.starts_with(b"sekrit"));
        assert!(plain[6..].iter().all(|b| *b == 0));
    }

    #[test]
    fn test_aes_roundtrip() {
        let prime = prime_25519();
        let (challenge, b) = make_challenge(&prime, 5, 0xBEEF);
        let ex = DhExchange::from_challenge(&challenge).unwrap();
        let resp = ex.respond_aes("alice", "sekrit").unwrap();

        let decoded = BASE64.decode(&resp).unwrap();
        let (client_pub, rest) = split_response(&decoded);
        let (iv, ciphertext) = rest.split_at(16);
        assert_eq!(ciphertext.len() % 16, 0);

        let secret = server_secret_bytes(&prime, client_pub, &b);
        let dec = cbc::Decryptor::<Aes256>::new_from_slices(&secret[..32], iv).unwrap();
        let plain = dec.decrypt_padded_vec_mut::<NoPadding>(ciphertext).unwrap();
        assert!(plain.starts_with(b"alice\0sekrit\0"));
    }

    #[test]
    fn test_small_prime_rejected_for_aes() {
        // 64-bit prime passes parsing but cannot key AES-256
        let prime = BigUint::from(0xFFFF_FFFF_FFFF_FFC5u64);
        let (challenge, _) = make_challenge(&prime, 5, 7);
        let ex = DhExchange::from_challenge(&challenge).unwrap();
        assert!(ex.respond_aes("a", "b").is_err());
        // Blowfish accepts short keys
        assert!(ex.respond_blowfish("a", "b").is_ok());
    }
}
