/// Build-time tuning for a heap.
///
/// Nothing here affects correctness: a bad `growth_*` pair only costs
/// either wasted address space or extra copying reallocs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
  /// Largest usable half to try reserving. The mapping is twice this size;
  /// the upper half is the guard.
  pub max_budget: usize,
  /// Requests strictly larger than this many bytes get inflated.
  pub growth_threshold: usize,
  /// Multiplier applied to inflated requests. `1` disables inflation.
  pub growth_factor: usize,
}

const KB: usize = 1024;
const MB: usize = KB * KB;
const TB: usize = MB * MB;

impl Config {
  pub const DEFAULT: Config = Config {
    max_budget: TB,
    growth_threshold: 2 * KB,
    growth_factor: 3,
  };

  pub const fn with_budget(
    self,
    max_budget: usize,
  ) -> Self {
    Self { max_budget, ..self }
  }

  pub const fn with_growth(
    self,
    growth_threshold: usize,
    growth_factor: usize,
  ) -> Self {
    Self {
      growth_threshold,
      growth_factor,
      ..self
    }
  }

  /// Payload capacity to reserve for a `requested`-byte allocation,
  /// anticipating a later `realloc`. Falls back to `requested` when the
  /// inflated value would overflow.
  pub const fn anticipate(
    &self,
    requested: usize,
  ) -> usize {
    if requested <= self.growth_threshold || self.growth_factor <= 1 {
      return requested;
    }

    match requested.checked_mul(self.growth_factor) {
      Some(inflated) => inflated,
      None => requested,
    }
  }
}

impl Default for Config {
  fn default() -> Self {
    Self::DEFAULT
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_anticipate_defaults() {
    let config = Config::DEFAULT;

    assert_eq!(config.anticipate(0), 0);
    assert_eq!(config.anticipate(2048), 2048);
    assert_eq!(config.anticipate(2049), 3 * 2049);
  }

  #[test]
  fn test_anticipate_disabled_and_saturating() {
    let off = Config::DEFAULT.with_growth(0, 1);
    assert_eq!(off.anticipate(1 << 20), 1 << 20);

    assert_eq!(Config::DEFAULT.anticipate(usize::MAX / 2), usize::MAX / 2);
  }

  #[test]
  fn test_builders_keep_other_fields() {
    let config = Config::DEFAULT.with_budget(1 << 20);
    assert_eq!(config.max_budget, 1 << 20);
    assert_eq!(config.growth_factor, 3);
    assert_eq!(Config::default(), Config::DEFAULT);
  }
}
