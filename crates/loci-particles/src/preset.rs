//! Particle presets: per-archetype configuration, TOML overrides and sanitising

use loci_core::{LociError, Rgb};
use std::fmt;
use std::str::FromStr;

/// Hard cap on particles per system
pub const MAX_PARTICLES: usize = 10_000;

/// Which archetype a particle system belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ParticleKind {
    Door,
    Object,
    Mist,
}

impl ParticleKind {
    pub const ALL: [ParticleKind; 3] = [ParticleKind::Door, ParticleKind::Object, ParticleKind::Mist];

    pub fn as_str(&self) -> &'static str {
        match self {
            ParticleKind::Door => "door",
            ParticleKind::Object => "object",
            ParticleKind::Mist => "mist",
        }
    }

    pub fn is_mist(&self) -> bool {
        matches!(self, ParticleKind::Mist)
    }

    /// Flicker frequency band in Hz
    pub fn flicker_band(&self) -> FloatRange {
        match self {
            ParticleKind::Door | ParticleKind::Object => FloatRange::new(1.0, 3.0),
            ParticleKind::Mist => FloatRange::new(0.3, 1.2),
        }
    }
}

impl fmt::Display for ParticleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ParticleKind {
    type Err = LociError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "door" => Ok(ParticleKind::Door),
            "object" => Ok(ParticleKind::Object),
            "mist" => Ok(ParticleKind::Mist),
            _ => Err(LociError::InvalidEnumValue {
                value: s.to_string(),
                allowed: Self::ALL.iter().map(|k| k.as_str().to_string()).collect(),
            }),
        }
    }
}

/// Closed `[min, max]` interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FloatRange {
    pub min: f32,
    pub max: f32,
}

impl FloatRange {
    pub const fn new(min: f32, max: f32) -> Self {
        Self { min, max }
    }

    /// Value at fraction `t` of the way from min to max
    pub fn lerp(&self, t: f32) -> f32 {
        self.min + (self.max - self.min) * t
    }

    fn ordered(self) -> Self {
        if self.min > self.max {
            Self::new(self.max, self.min)
        } else {
            self
        }
    }
}

/// Spherical shell bounds around the system origin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShellRadius {
    pub inner: f32,
    pub outer: f32,
}

impl ShellRadius {
    pub const fn new(inner: f32, outer: f32) -> Self {
        Self { inner, outer }
    }
}

/// Shader tuning and breathing parameters. Only mist systems read these.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MistParams {
    /// Global opacity oscillation frequency; 0 disables breathing
    pub breath_hz: f32,
    pub breath_min: f32,
    pub breath_max: f32,
    pub softness: f32,
    pub noise_scale: f32,
    pub noise_strength: f32,
    pub wisp_speed: f32,
    pub wisp_floor: f32,
    pub midlife_boost: f32,
    /// Spawn fade, as a fraction of lifetime
    pub fade_in_frac: f32,
    /// Death fade, as a fraction of lifetime
    pub fade_out_frac: f32,
    pub fade_jitter: f32,
}

impl Default for MistParams {
    fn default() -> Self {
        Self {
            breath_hz: 0.0,
            breath_min: 1.0,
            breath_max: 1.0,
            softness: 0.6,
            noise_scale: 1.6,
            noise_strength: 0.5,
            wisp_speed: 0.05,
            wisp_floor: 0.15,
            midlife_boost: 0.0,
            fade_in_frac: 0.2,
            fade_out_frac: 0.3,
            fade_jitter: 0.0,
        }
    }
}

/// Immutable configuration for one particle archetype
#[derive(Debug, Clone, PartialEq)]
pub struct ParticlePreset {
    pub kind: ParticleKind,
    pub particle_count: usize,
    /// Fallback palette (and the mist colours)
    pub colour_a: Rgb,
    pub colour_b: Rgb,
    pub spawn_radius: ShellRadius,
    pub speed: FloatRange,
    pub gravity: f32,
    pub spread: f32,
    pub upward_bias: f32,
    pub base_size: f32,
    pub size_jitter: f32,
    /// Seconds
    pub lifetime: FloatRange,
    pub base_opacity: f32,
    /// Depth of the per-particle flicker dip
    pub opacity_variation: f32,
    /// Slow-fall factor applied to `gravity` every step (door/object)
    pub gravity_scale: f32,
    /// Full width of the per-step velocity jitter (door/object)
    pub jitter: f32,
    /// Full width of the per-step velocity drift (mist)
    pub drift: f32,
    /// Per-step velocity multiplier (mist)
    pub damping: f32,
    pub mist: MistParams,
}

impl ParticlePreset {
    pub fn door() -> Self {
        Self {
            kind: ParticleKind::Door,
            particle_count: 120,
            colour_a: Rgb::from_hex(0xffd27f),
            colour_b: Rgb::from_hex(0xff8a3d),
            spawn_radius: ShellRadius::new(0.35, 0.9),
            speed: FloatRange::new(0.05, 0.15),
            gravity: 0.6,
            spread: 0.12,
            upward_bias: 0.8,
            base_size: 0.06,
            size_jitter: 0.05,
            lifetime: FloatRange::new(1.6, 3.2),
            base_opacity: 0.85,
            opacity_variation: 0.25,
            gravity_scale: 0.08,
            jitter: 0.05,
            drift: 0.0015,
            damping: 0.9995,
            mist: MistParams::default(),
        }
    }

    pub fn object() -> Self {
        Self {
            kind: ParticleKind::Object,
            particle_count: 80,
            colour_a: Rgb::from_hex(0x9fd8ff),
            colour_b: Rgb::from_hex(0x5b7cff),
            spawn_radius: ShellRadius::new(0.2, 0.6),
            speed: FloatRange::new(0.03, 0.1),
            gravity: 0.4,
            spread: 0.08,
            upward_bias: 0.6,
            base_size: 0.045,
            size_jitter: 0.035,
            lifetime: FloatRange::new(1.2, 2.6),
            base_opacity: 0.8,
            opacity_variation: 0.2,
            ..Self::door()
        }
    }

    pub fn mist() -> Self {
        Self {
            kind: ParticleKind::Mist,
            particle_count: 260,
            colour_a: Rgb::from_hex(0xd8e4f0),
            colour_b: Rgb::from_hex(0x9fb3c8),
            spawn_radius: ShellRadius::new(0.5, 6.0),
            speed: FloatRange::new(0.002, 0.012),
            gravity: 0.0,
            spread: 0.0,
            upward_bias: 0.0,
            base_size: 2.2,
            size_jitter: 1.6,
            lifetime: FloatRange::new(9.0, 18.0),
            base_opacity: 0.32,
            opacity_variation: 0.0,
            gravity_scale: 0.08,
            jitter: 0.05,
            drift: 0.0015,
            damping: 0.9995,
            mist: MistParams {
                breath_hz: 0.08,
                breath_min: 0.75,
                breath_max: 1.0,
                softness: 0.65,
                noise_scale: 1.6,
                noise_strength: 0.55,
                wisp_speed: 0.05,
                wisp_floor: 0.15,
                midlife_boost: 0.25,
                fade_in_frac: 0.2,
                fade_out_frac: 0.3,
                fade_jitter: 0.1,
            },
        }
    }

    /// Built-in defaults for an archetype
    pub fn for_kind(kind: ParticleKind) -> Self {
        match kind {
            ParticleKind::Door => Self::door(),
            ParticleKind::Object => Self::object(),
            ParticleKind::Mist => Self::mist(),
        }
    }

    /// Enforce the preset invariants: fractions in [0,1], ordered ranges,
    /// non-negative radii and lifetimes, capped particle count.
    pub fn sanitized(mut self) -> Self {
        self.particle_count = self.particle_count.min(MAX_PARTICLES);

        let inner = self.spawn_radius.inner.max(0.0);
        let outer = self.spawn_radius.outer.max(0.0);
        self.spawn_radius = ShellRadius::new(inner.min(outer), inner.max(outer));

        self.speed = self.speed.ordered();
        self.lifetime = FloatRange::new(self.lifetime.min.max(0.0), self.lifetime.max.max(0.0))
            .ordered();
        self.base_size = self.base_size.max(0.0);
        self.size_jitter = self.size_jitter.max(0.0);

        self.base_opacity = unit(self.base_opacity);
        self.opacity_variation = unit(self.opacity_variation);
        self.damping = unit(self.damping);

        let m = &mut self.mist;
        m.breath_hz = m.breath_hz.max(0.0);
        m.breath_min = unit(m.breath_min);
        m.breath_max = unit(m.breath_max);
        m.softness = unit(m.softness);
        m.noise_strength = unit(m.noise_strength);
        m.wisp_floor = unit(m.wisp_floor);
        m.midlife_boost = unit(m.midlife_boost);
        m.fade_in_frac = unit(m.fade_in_frac);
        m.fade_out_frac = unit(m.fade_out_frac);
        m.fade_jitter = unit(m.fade_jitter);

        self
    }

    /// Overlay a TOML table onto the defaults for `kind`, then sanitise.
    /// Unknown keys and malformed colours are logged and ignored.
    pub fn from_toml(kind: ParticleKind, table: &toml::value::Table) -> Self {
        let mut p = Self::for_kind(kind);

        for (key, v) in table {
            match key.as_str() {
                "particle_count" => {
                    let n = v.as_integer().unwrap_or(p.particle_count as i64).max(0);
                    p.particle_count = n as usize;
                }
                "colour_a" | "color_a" => p.colour_a = toml_rgb(key, v, p.colour_a),
                "colour_b" | "color_b" => p.colour_b = toml_rgb(key, v, p.colour_b),
                "spawn_radius_inner" => p.spawn_radius.inner = toml_f32(v, p.spawn_radius.inner),
                "spawn_radius_outer" => p.spawn_radius.outer = toml_f32(v, p.spawn_radius.outer),
                "speed_min" => p.speed.min = toml_f32(v, p.speed.min),
                "speed_max" => p.speed.max = toml_f32(v, p.speed.max),
                "gravity" => p.gravity = toml_f32(v, p.gravity),
                "spread" => p.spread = toml_f32(v, p.spread),
                "upward_bias" => p.upward_bias = toml_f32(v, p.upward_bias),
                "base_size" => p.base_size = toml_f32(v, p.base_size),
                "size_jitter" => p.size_jitter = toml_f32(v, p.size_jitter),
                "lifetime_min" => p.lifetime.min = toml_f32(v, p.lifetime.min),
                "lifetime_max" => p.lifetime.max = toml_f32(v, p.lifetime.max),
                "base_opacity" => p.base_opacity = toml_f32(v, p.base_opacity),
                "opacity_variation" => p.opacity_variation = toml_f32(v, p.opacity_variation),
                "gravity_scale" => p.gravity_scale = toml_f32(v, p.gravity_scale),
                "jitter" => p.jitter = toml_f32(v, p.jitter),
                "drift" => p.drift = toml_f32(v, p.drift),
                "damping" => p.damping = toml_f32(v, p.damping),
                "breath_hz" => p.mist.breath_hz = toml_f32(v, p.mist.breath_hz),
                "breath_min" => p.mist.breath_min = toml_f32(v, p.mist.breath_min),
                "breath_max" => p.mist.breath_max = toml_f32(v, p.mist.breath_max),
                "softness" => p.mist.softness = toml_f32(v, p.mist.softness),
                "noise_scale" => p.mist.noise_scale = toml_f32(v, p.mist.noise_scale),
                "noise_strength" => p.mist.noise_strength = toml_f32(v, p.mist.noise_strength),
                "wisp_speed" => p.mist.wisp_speed = toml_f32(v, p.mist.wisp_speed),
                "wisp_floor" => p.mist.wisp_floor = toml_f32(v, p.mist.wisp_floor),
                "midlife_boost" => p.mist.midlife_boost = toml_f32(v, p.mist.midlife_boost),
                "fade_in_frac" => p.mist.fade_in_frac = toml_f32(v, p.mist.fade_in_frac),
                "fade_out_frac" => p.mist.fade_out_frac = toml_f32(v, p.mist.fade_out_frac),
                "fade_jitter" => p.mist.fade_jitter = toml_f32(v, p.mist.fade_jitter),
                other => log::warn!("ignoring unknown {kind} preset key '{other}'"),
            }
        }

        p.sanitized()
    }

    /// Inverse of `from_toml`: every key, colours as `#rrggbb`
    pub fn to_toml(&self) -> toml::value::Table {
        use toml::Value;

        let mut t = toml::value::Table::new();
        let mut put = |k: &str, v: f32| {
            t.insert(k.to_string(), Value::Float(round6(v)));
        };
        put("spawn_radius_inner", self.spawn_radius.inner);
        put("spawn_radius_outer", self.spawn_radius.outer);
        put("speed_min", self.speed.min);
        put("speed_max", self.speed.max);
        put("gravity", self.gravity);
        put("spread", self.spread);
        put("upward_bias", self.upward_bias);
        put("base_size", self.base_size);
        put("size_jitter", self.size_jitter);
        put("lifetime_min", self.lifetime.min);
        put("lifetime_max", self.lifetime.max);
        put("base_opacity", self.base_opacity);
        put("opacity_variation", self.opacity_variation);
        put("gravity_scale", self.gravity_scale);
        put("jitter", self.jitter);
        put("drift", self.drift);
        put("damping", self.damping);
        if self.kind.is_mist() {
            let m = &self.mist;
            put("breath_hz", m.breath_hz);
            put("breath_min", m.breath_min);
            put("breath_max", m.breath_max);
            put("softness", m.softness);
            put("noise_scale", m.noise_scale);
            put("noise_strength", m.noise_strength);
            put("wisp_speed", m.wisp_speed);
            put("wisp_floor", m.wisp_floor);
            put("midlife_boost", m.midlife_boost);
            put("fade_in_frac", m.fade_in_frac);
            put("fade_out_frac", m.fade_out_frac);
            put("fade_jitter", m.fade_jitter);
        }
        t.insert(
            "particle_count".to_string(),
            Value::Integer(self.particle_count as i64),
        );
        t.insert("colour_a".to_string(), Value::String(self.colour_a.to_string()));
        t.insert("colour_b".to_string(), Value::String(self.colour_b.to_string()));
        t
    }
}

fn unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

// f32 -> f64 widening prints noise digits (0.85 -> 0.8500000238418579)
fn round6(v: f32) -> f64 {
    (v as f64 * 1e6).round() / 1e6
}

// ── TOML helpers (handle integer/float coercion) ──

pub(crate) fn toml_f32(v: &toml::Value, default: f32) -> f32 {
    v.as_float()
        .map(|f| f as f32)
        .or_else(|| v.as_integer().map(|i| i as f32))
        .filter(|f| f.is_finite())
        .unwrap_or(default)
}

/// Accepts `"#rrggbb"`, a `0xRRGGBB` integer or an `[r, g, b]` float array
pub(crate) fn parse_toml_rgb(v: &toml::Value) -> Option<Rgb> {
    match v {
        toml::Value::String(s) => Rgb::parse_hex(s),
        toml::Value::Integer(i) => u32::try_from(*i).ok().map(Rgb::from_hex),
        toml::Value::Array(arr) if arr.len() == 3 => {
            let c: Vec<f32> = arr.iter().map(|x| toml_f32(x, f32::NAN)).collect();
            if c.iter().all(|x| x.is_finite()) {
                Some(Rgb::new(c[0], c[1], c[2]))
            } else {
                None
            }
        }
        _ => None,
    }
}

fn toml_rgb(key: &str, v: &toml::Value, default: Rgb) -> Rgb {
    parse_toml_rgb(v).unwrap_or_else(|| {
        log::warn!("preset key '{key}' is not a colour: {v}");
        default
    })
}
