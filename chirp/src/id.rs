use nanoid::nanoid;

/// Alphabet for store-assigned document identifiers (no ambiguous glyphs).
const DOCUMENT_ID_ALPHABET: &[char] = &[
    'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K', 'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y',
    'Z', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'j', 'm', 'n', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];
/// Default document id length.
const DOCUMENT_ID_LENGTH: usize = 20;
/// Identity uids are longer so they never collide with document ids in logs.
const UID_LENGTH: usize = 28;

/// Generates a new document identifier.
pub fn generate_document_id() -> String {
    nanoid!(DOCUMENT_ID_LENGTH, DOCUMENT_ID_ALPHABET)
}

/// Generates a new identity uid.
pub fn generate_uid() -> String {
    nanoid!(UID_LENGTH, DOCUMENT_ID_ALPHABET)
}
