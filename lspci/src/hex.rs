use num_traits::Num;

/// Parses a bare hexadecimal number, rejecting the signs and blanks
/// `from_str_radix` would otherwise let through.
pub(crate) fn parse_hex<T: Num>(value: &str) -> Option<T> {
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    T::from_str_radix(value, 16).ok()
}
