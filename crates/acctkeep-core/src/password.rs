//! Password generation for new entries.

use rand::Rng;

/// Characters a generated password is drawn from.
pub const CHARSET: &[u8] =
    b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+~";

/// Length of a generated password.
pub const PASSWORD_LENGTH: usize = 16;

/// Produces passwords for entries created without one.
pub trait PasswordGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Uniform random draw from [`CHARSET`] using the thread RNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomPasswordGenerator;

impl PasswordGenerator for RandomPasswordGenerator {
    fn generate(&self) -> String {
        generate_password()
    }
}

/// Generate a [`PASSWORD_LENGTH`]-character password.
pub fn generate_password() -> String {
    let mut rng = rand::thread_rng();
    (0..PASSWORD_LENGTH)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_password_has_fixed_length_and_alphabet() {
        for _ in 0..50 {
            let password = generate_password();
            assert_eq!(password.chars().count(), PASSWORD_LENGTH);
            assert!(password.bytes().all(|b| CHARSET.contains(&b)));
        }
    }

    #[test]
    fn generated_passwords_differ() {
        assert_ne!(generate_password(), generate_password());
    }
}
