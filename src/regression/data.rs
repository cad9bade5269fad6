// Data contract: validated, rectangular observation tables

use crate::domain::{FrontierError, Result};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

/// Anything that can be promoted to an `n × d` row-major table.
///
/// One-dimensional inputs become a single column.
pub trait IntoTable {
    fn into_table(self, name: &str) -> Result<Array2<f64>>;
}

impl IntoTable for Array2<f64> {
    fn into_table(self, _name: &str) -> Result<Array2<f64>> {
        Ok(self)
    }
}

impl IntoTable for ArrayView2<'_, f64> {
    fn into_table(self, _name: &str) -> Result<Array2<f64>> {
        Ok(self.to_owned())
    }
}

impl IntoTable for Array1<f64> {
    fn into_table(self, _name: &str) -> Result<Array2<f64>> {
        Ok(self.insert_axis(Axis(1)))
    }
}

impl IntoTable for ArrayView1<'_, f64> {
    fn into_table(self, name: &str) -> Result<Array2<f64>> {
        self.to_owned().into_table(name)
    }
}

impl IntoTable for Vec<f64> {
    fn into_table(self, name: &str) -> Result<Array2<f64>> {
        Array1::from(self).into_table(name)
    }
}

impl IntoTable for &[f64] {
    fn into_table(self, name: &str) -> Result<Array2<f64>> {
        self.to_vec().into_table(name)
    }
}

impl IntoTable for &[Vec<f64>] {
    fn into_table(self, name: &str) -> Result<Array2<f64>> {
        let rows = self.len();
        let cols = self.first().map_or(0, Vec::len);
        if let Some((i, row)) = self.iter().enumerate().find(|(_, r)| r.len() != cols) {
            return Err(FrontierError::Shape(format!(
                "{}: row {} has {} columns, row 0 has {}",
                name,
                i,
                row.len(),
                cols
            )));
        }
        let flat: Vec<f64> = self.iter().flatten().copied().collect();
        Array2::from_shape_vec((rows, cols), flat)
            .map_err(|e| FrontierError::Shape(format!("{}: {}", name, e)))
    }
}

impl IntoTable for Vec<Vec<f64>> {
    fn into_table(self, name: &str) -> Result<Array2<f64>> {
        self.as_slice().into_table(name)
    }
}

fn check_table(table: &Array2<f64>, name: &str, rows: usize) -> Result<()> {
    if table.nrows() != rows {
        return Err(FrontierError::Shape(format!(
            "{} has {} rows but y has {}",
            name,
            table.nrows(),
            rows
        )));
    }
    if table.ncols() == 0 {
        return Err(FrontierError::Shape(format!("{} has no columns", name)));
    }
    if let Some(((i, j), v)) = table.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(FrontierError::InvalidData(format!(
            "{}[{}][{}] is not finite ({})",
            name, i, j, v
        )));
    }
    Ok(())
}

/// Observation set: outputs y (n × p), inputs x (n × m), optional undesirable
/// outputs b (n × q) and contextual variables z (n × k).
#[derive(Debug, Clone)]
pub struct Observations {
    y: Array2<f64>,
    x: Array2<f64>,
    b: Option<Array2<f64>>,
    z: Option<Array2<f64>>,
}

impl Observations {
    /// Validate outputs and inputs; fails with a shape error on mismatched rows or n < 2
    pub fn new(y: impl IntoTable, x: impl IntoTable) -> Result<Self> {
        let y = y.into_table("y")?;
        let rows = y.nrows();
        if rows < 2 {
            return Err(FrontierError::Shape(format!(
                "at least 2 observations are required, got {}",
                rows
            )));
        }
        check_table(&y, "y", rows)?;
        let x = x.into_table("x")?;
        check_table(&x, "x", rows)?;
        Ok(Self { y, x, b: None, z: None })
    }

    pub fn with_undesirable(mut self, b: impl IntoTable) -> Result<Self> {
        let b = b.into_table("b")?;
        check_table(&b, "b", self.len())?;
        self.b = Some(b);
        Ok(self)
    }

    pub fn with_contextual(mut self, z: impl IntoTable) -> Result<Self> {
        let z = z.into_table("z")?;
        check_table(&z, "z", self.len())?;
        self.z = Some(z);
        Ok(self)
    }

    /// Number of observations n
    pub fn len(&self) -> usize {
        self.y.nrows()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of inputs m
    pub fn num_inputs(&self) -> usize {
        self.x.ncols()
    }

    /// Number of desirable outputs p
    pub fn num_outputs(&self) -> usize {
        self.y.ncols()
    }

    /// Number of undesirable outputs q (0 when absent)
    pub fn num_undesirable(&self) -> usize {
        self.b.as_ref().map_or(0, |b| b.ncols())
    }

    /// Number of contextual variables k (0 when absent)
    pub fn num_contextual(&self) -> usize {
        self.z.as_ref().map_or(0, |z| z.ncols())
    }

    pub fn y(&self) -> ArrayView2<'_, f64> {
        self.y.view()
    }

    pub fn x(&self) -> ArrayView2<'_, f64> {
        self.x.view()
    }

    pub fn b(&self) -> Option<ArrayView2<'_, f64>> {
        self.b.as_ref().map(|b| b.view())
    }

    pub fn z(&self) -> Option<ArrayView2<'_, f64>> {
        self.z.as_ref().map(|z| z.view())
    }

    /// First output column, the regressand of single-output models
    pub fn output(&self) -> ArrayView1<'_, f64> {
        self.y.column(0)
    }
}
