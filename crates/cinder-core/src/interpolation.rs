use regex::Regex;
use std::collections::HashMap;

/// Context for command interpolation.
#[derive(Debug, Clone, Default)]
pub struct InterpolationContext {
    /// Resolved environment for the executing instance
    pub env: HashMap<String, String>,
    /// Matrix axis values for the executing instance
    pub matrix: HashMap<String, String>,
}

impl InterpolationContext {
    /// Create a new empty context.
    pub fn new() -> Self {
        Self::default()
    }

    /// Interpolate variables in a string.
    ///
    /// Supports:
    /// - `${{ matrix.axis }}` - matrix axis value
    /// - `${{ env.NAME }}` - resolved environment variable
    pub fn interpolate(&self, input: &str) -> String {
        // Simple regex for ${{ ... }}
        // Note: nesting not supported in this simple version
        let re = Regex::new(r"\$\{\{\s*([^}]+)\s*\}\}").unwrap();

        re.replace_all(input, |caps: &regex::Captures| {
            let expr = caps.get(1).map_or("", |m| m.as_str()).trim();
            self.resolve_expression(expr)
        })
        .to_string()
    }

    /// Resolve a single expression.
    fn resolve_expression(&self, expr: &str) -> String {
        // Handle matrix.axis
        if let Some(key) = expr.strip_prefix("matrix.") {
            return self.matrix.get(key).cloned().unwrap_or_default();
        }

        // Handle env.NAME
        if let Some(name) = expr.strip_prefix("env.") {
            return self
                .env
                .get(name)
                .cloned()
                .or_else(|| std::env::var(name).ok())
                .unwrap_or_default();
        }

        // Direct environment lookup
        self.env.get(expr).cloned().unwrap_or_default()
    }
}
