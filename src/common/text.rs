// src/common/text.rs

// Caracteres removidos das pontas de nome, documento e telefone
const EDGE_TRIM: &[char] = &[' ', ',', '.'];

/// Remove espaços, vírgulas e pontos das pontas.
pub fn trim_edges(value: &str) -> String {
    value.trim_matches(EDGE_TRIM).to_string()
}

/// `trim_edges` + qualquer sequência de espaços vira um único espaço.
pub fn trim_and_collapse(value: &str) -> String {
    trim_edges(value)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn non_empty(value: String) -> Option<String> {
    if value.is_empty() { None } else { Some(value) }
}
