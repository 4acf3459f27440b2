//! Genome codec (C1). Opaque to physics: the only consumer outside this
//! module is the wire layer, which echoes the genome string verbatim.
//!
//! Format: dash-separated tokens, each prefixed by a letter —
//! `B<int>` body, `S<int>` shell, `P<int>` limb/pattern, `C<6-hex>` color.
//! Decoding is total: unrecognized or malformed tokens are skipped, missing
//! tokens fall back to defaults, duplicate tokens let the last one win.

const BODY_VARIANTS: u32 = 16;
const SHELL_VARIANTS: u32 = 16;
const PATTERN_VARIANTS: u32 = 16;
const DEFAULT_COLOR: &str = "228B22";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Genome {
    pub body: u32,
    pub shell: u32,
    pub pattern: u32,
    pub color: [u8; 3],
}

impl Default for Genome {
    fn default() -> Self {
        Self {
            body: 0,
            shell: 0,
            pattern: 0,
            color: hex_to_rgb(DEFAULT_COLOR).expect("default color is valid hex"),
        }
    }
}

impl Genome {
    /// Clamp indices into their enumerated ranges. The round-trip law is
    /// `decode(encode(x)) == normalize(x)`.
    pub fn normalize(self) -> Self {
        Self {
            body: self.body % BODY_VARIANTS,
            shell: self.shell % SHELL_VARIANTS,
            pattern: self.pattern % PATTERN_VARIANTS,
            color: self.color,
        }
    }
}

pub fn encode(genome: &Genome) -> String {
    let Genome {
        body,
        shell,
        pattern,
        color,
    } = genome.normalize();
    format!(
        "B{body}-S{shell}-P{pattern}-C{:02X}{:02X}{:02X}",
        color[0], color[1], color[2]
    )
}

/// Total: never fails. Missing/unrecognized tokens fall back to defaults,
/// duplicates let the last occurrence win.
pub fn decode(raw: &str) -> Genome {
    let mut genome = Genome::default();
    for token in raw.split('-') {
        let mut chars = token.chars();
        let Some(tag) = chars.next() else { continue };
        let rest: String = chars.collect();
        match tag {
            'B' => {
                if let Ok(v) = rest.parse() {
                    genome.body = v;
                }
            }
            'S' => {
                if let Ok(v) = rest.parse() {
                    genome.shell = v;
                }
            }
            'P' => {
                if let Ok(v) = rest.parse() {
                    genome.pattern = v;
                }
            }
            'C' => {
                if let Some(rgb) = hex_to_rgb(&rest) {
                    genome.color = rgb;
                }
            }
            _ => continue,
        }
    }
    genome.normalize()
}

fn hex_to_rgb(hex: &str) -> Option<[u8; 3]> {
    if hex.len() != 6 {
        return None;
    }
    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some([r, g, b])
}
