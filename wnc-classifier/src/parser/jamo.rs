//! Hangul jamo recomposition
//!
//! Filenames are sometimes obfuscated by typing syllables as separate
//! compatibility jamo (`ㄷㅐ공`) or by substituting Latin letters that look
//! like vowels (`ㄷH공`). This module undoes both.

const SYLLABLE_BASE: u32 = 0xAC00;
const SYLLABLE_LAST: u32 = 0xD7A3;

/// Initial consonants in syllable-table order
const CHOSEONG: [char; 19] = [
    'ㄱ', 'ㄲ', 'ㄴ', 'ㄷ', 'ㄸ', 'ㄹ', 'ㅁ', 'ㅂ', 'ㅃ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅉ', 'ㅊ', 'ㅋ',
    'ㅌ', 'ㅍ', 'ㅎ',
];

/// Medial vowels in syllable-table order
const JUNGSEONG: [char; 21] = [
    'ㅏ', 'ㅐ', 'ㅑ', 'ㅒ', 'ㅓ', 'ㅔ', 'ㅕ', 'ㅖ', 'ㅗ', 'ㅘ', 'ㅙ', 'ㅚ', 'ㅛ', 'ㅜ', 'ㅝ', 'ㅞ',
    'ㅟ', 'ㅠ', 'ㅡ', 'ㅢ', 'ㅣ',
];

/// Final consonants in syllable-table order; index 0 is "no final"
const JONGSEONG: [char; 28] = [
    '\0', 'ㄱ', 'ㄲ', 'ㄳ', 'ㄴ', 'ㄵ', 'ㄶ', 'ㄷ', 'ㄹ', 'ㄺ', 'ㄻ', 'ㄼ', 'ㄽ', 'ㄾ', 'ㄿ', 'ㅀ',
    'ㅁ', 'ㅂ', 'ㅄ', 'ㅅ', 'ㅆ', 'ㅇ', 'ㅈ', 'ㅊ', 'ㅋ', 'ㅌ', 'ㅍ', 'ㅎ',
];

/// Vowel + ㅣ compound medials
const COMPOUND_WITH_I: [(char, char); 5] =
    [('ㅗ', 'ㅚ'), ('ㅜ', 'ㅟ'), ('ㅡ', 'ㅢ'), ('ㅏ', 'ㅐ'), ('ㅓ', 'ㅔ')];

/// Latin letters that visually stand in for a vowel jamo
fn latin_vowel(c: char) -> Option<char> {
    Some(match c {
        'r' | 'R' | 'k' => 'ㅏ',
        'H' | 'o' => 'ㅐ',
        'l' | 'I' => 'ㅣ',
        'i' => 'ㅑ',
        'j' => 'ㅓ',
        'p' => 'ㅔ',
        'u' => 'ㅕ',
        'h' => 'ㅗ',
        'y' => 'ㅛ',
        'n' => 'ㅜ',
        'b' => 'ㅠ',
        'm' => 'ㅡ',
        _ => return None,
    })
}

fn is_compat_jamo(c: char) -> bool {
    ('\u{3131}'..='\u{318E}').contains(&c)
}

fn is_consonant_jamo(c: char) -> bool {
    ('\u{3131}'..='\u{314E}').contains(&c)
}

fn is_vowel_jamo(c: char) -> bool {
    JUNGSEONG.contains(&c)
}

fn is_syllable(c: char) -> bool {
    (SYLLABLE_BASE..=SYLLABLE_LAST).contains(&(c as u32))
}

fn index_of(table: &[char], c: char) -> Option<u32> {
    table.iter().position(|&t| t == c).map(|i| i as u32)
}

fn compose(cho: u32, jung: u32, jong: u32) -> Option<char> {
    char::from_u32(SYLLABLE_BASE + cho * 588 + jung * 28 + jong)
}

/// Split a precomposed syllable into (initial, medial, final) indices
fn decompose(c: char) -> Option<(u32, u32, u32)> {
    if !is_syllable(c) {
        return None;
    }
    let offset = c as u32 - SYLLABLE_BASE;
    Some((offset / 588, (offset % 588) / 28, offset % 28))
}

/// Recompose split jamo (and jamo-lookalike Latin letters) into syllables
///
/// Strings without any compatibility jamo are returned unchanged.
///
/// # Example
/// `"ㄷH공ㅂlㄱr"` becomes `"대공비가"`.
pub fn compose_jamo(input: &str) -> String {
    if !input.chars().any(is_compat_jamo) {
        return input.to_string();
    }

    // Latin stand-ins only count directly after a consonant jamo
    let mut chars: Vec<char> = Vec::with_capacity(input.len());
    for c in input.chars() {
        let replaced = match (chars.last(), latin_vowel(c)) {
            (Some(&prev), Some(vowel)) if is_consonant_jamo(prev) => vowel,
            _ => c,
        };
        chars.push(replaced);
    }

    let mut i = 0;
    while i + 1 < chars.len() {
        let (current, next) = (chars[i], chars[i + 1]);
        let after = chars.get(i + 2).copied();

        // initial + medial
        if let (Some(cho), Some(jung)) = (index_of(&CHOSEONG, current), index_of(&JUNGSEONG, next)) {
            if let Some(syllable) = compose(cho, jung, 0) {
                chars.splice(i..i + 2, [syllable]);
                continue;
            }
        }

        if let Some((cho, jung, jong)) = decompose(current) {
            if jong == 0 {
                // open syllable + ㅣ forms a compound medial
                if next == 'ㅣ' {
                    let medial = JUNGSEONG[jung as usize];
                    if let Some(&(_, merged)) = COMPOUND_WITH_I.iter().find(|(m, _)| *m == medial) {
                        if let Some(syllable) = index_of(&JUNGSEONG, merged).and_then(|j| compose(cho, j, 0)) {
                            chars[i] = syllable;
                            chars.remove(i + 1);
                            continue;
                        }
                    }
                }

                // open syllable + final consonant, unless that consonant starts the next syllable
                let next_starts_syllable = after.map(is_vowel_jamo).unwrap_or(false);
                if !next_starts_syllable {
                    if let Some(jong) = index_of(&JONGSEONG[1..], next).map(|j| j + 1) {
                        if let Some(syllable) = compose(cho, jung, jong) {
                            chars[i] = syllable;
                            chars.remove(i + 1);
                            continue;
                        }
                    }
                }
            }
        }

        i += 1;
    }

    chars.into_iter().collect()
}
