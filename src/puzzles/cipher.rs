//! Monoalphabetic substitution used by the cipher puzzles.

const PLAIN: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// An alphabet is valid if it is a permutation of `A..Z`
pub fn check_alphabet(alphabet: &str) -> Result<(), String> {
    let mut letters: Vec<char> = alphabet.to_uppercase().chars().collect();
    letters.sort_unstable();
    if letters.iter().collect::<String>() != PLAIN {
        return Err("cipher_alphabet must be a permutation of A-Z".to_string());
    }
    Ok(())
}

fn substitute(text: &str, from: &str, to: &str) -> String {
    let from: Vec<char> = from.chars().collect();
    let to: Vec<char> = to.to_uppercase().chars().collect();
    text.to_uppercase()
        .chars()
        .map(|c| match from.iter().position(|f| *f == c) {
            Some(i) => to.get(i).copied().unwrap_or(c),
            None => c,
        })
        .collect()
}

/// Encipher `plaintext`; non-letters pass through unchanged
pub fn encipher(plaintext: &str, alphabet: &str) -> String {
    substitute(plaintext, PLAIN, alphabet)
}

pub fn decipher(ciphertext: &str, alphabet: &str) -> String {
    substitute(ciphertext, &alphabet.to_uppercase(), PLAIN)
}
