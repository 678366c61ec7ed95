//! A small linear-programming model container: named variables with bounds,
//! linear constraints, a minimization objective, and serialization to a
//! gzipped free-format MPS file.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use flate2::Compression;
use flate2::write::GzEncoder;

/// Handle to a variable of a [`Model`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Var(usize);

/// Relation between a constraint's left-hand side and its right-hand side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sense {
    Le,
    Eq,
}

#[derive(Debug, Clone)]
struct Column {
    name: String,
    lb: f64,
    ub: f64,
    integer: bool,
    obj: f64,
}

#[derive(Debug, Clone)]
struct Row {
    name: String,
    sense: Sense,
    rhs: f64,
    terms: Vec<(Var, f64)>,
}

/// A linear combination of variables.
#[derive(Debug, Clone, Default)]
pub struct LinExpr {
    terms: Vec<(Var, f64)>,
}

impl LinExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, var: Var, coeff: f64) {
        self.terms.push((var, coeff));
    }

    /// Merges repeated occurrences of a variable into one term and drops
    /// zero coefficients.
    fn combined(mut self) -> Vec<(Var, f64)> {
        self.terms.sort_by_key(|(var, _)| var.0);
        let mut combined: Vec<(Var, f64)> = vec![];
        for (var, coeff) in self.terms {
            match combined.last_mut() {
                Some((last, total)) if *last == var => *total += coeff,
                _ => combined.push((var, coeff)),
            }
        }
        combined.retain(|(_, coeff)| *coeff != 0.0);
        combined
    }
}

/// An in-memory MIP: columns, rows and an objective, written out on demand.
pub struct Model {
    name: String,
    cols: Vec<Column>,
    rows: Vec<Row>,
}

impl Model {
    pub fn new(name: impl Into<String>) -> Self {
        Model { name: name.into(), cols: vec![], rows: vec![] }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Adds a continuous variable bounded in [lb, ub].
    pub fn add_var(&mut self, lb: f64, ub: f64, name: String) -> Var {
        self.cols.push(Column { name, lb, ub, integer: false, obj: 0.0 });
        Var(self.cols.len() - 1)
    }

    /// Adds an integer variable bounded in [lb, ub].
    pub fn add_int_var(&mut self, lb: f64, ub: f64, name: String) -> Var {
        self.cols.push(Column { name, lb, ub, integer: true, obj: 0.0 });
        Var(self.cols.len() - 1)
    }

    pub fn add_constr(&mut self, expr: LinExpr, sense: Sense, rhs: f64, name: String) {
        self.rows.push(Row { name, sense, rhs, terms: expr.combined() });
    }

    /// Sets the objective to minimize the given expression.
    pub fn minimize(&mut self, expr: LinExpr) {
        for col in self.cols.iter_mut() {
            col.obj = 0.0;
        }
        for (var, coeff) in expr.combined() {
            self.cols[var.0].obj = coeff;
        }
    }

    pub fn nb_vars(&self) -> usize {
        self.cols.len()
    }

    pub fn nb_constraints(&self) -> usize {
        self.rows.len()
    }

    /// Serializes the model to a gzipped free-format MPS file.
    pub fn write_mps_gz(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        let mut out = GzEncoder::new(BufWriter::new(file), Compression::default());
        self.write_mps(&mut out)?;
        out.finish()?.flush()?;
        Ok(())
    }

    fn write_mps(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "NAME          {}", self.name)?;

        writeln!(out, "ROWS")?;
        writeln!(out, " N  OBJ")?;
        for row in self.rows.iter() {
            let sense = match row.sense {
                Sense::Le => 'L',
                Sense::Eq => 'E',
            };
            writeln!(out, " {}  {}", sense, row.name)?;
        }

        // column-major entries, so transpose the rows first
        let mut entries: Vec<Vec<(usize, f64)>> = vec![vec![]; self.cols.len()];
        for (r, row) in self.rows.iter().enumerate() {
            for (var, coeff) in row.terms.iter() {
                entries[var.0].push((r, *coeff));
            }
        }

        writeln!(out, "COLUMNS")?;
        let mut in_integer_block = false;
        for (c, col) in self.cols.iter().enumerate() {
            if col.integer != in_integer_block {
                let marker = if col.integer { "'INTORG'" } else { "'INTEND'" };
                writeln!(out, "    MARKER                 'MARKER'                 {marker}")?;
                in_integer_block = col.integer;
            }
            if col.obj != 0.0 {
                writeln!(out, "    {}  OBJ  {}", col.name, col.obj)?;
            } else if entries[c].is_empty() {
                // every declared column must appear at least once
                writeln!(out, "    {}  OBJ  0", col.name)?;
            }
            for (r, coeff) in entries[c].iter() {
                writeln!(out, "    {}  {}  {}", col.name, self.rows[*r].name, coeff)?;
            }
        }
        if in_integer_block {
            writeln!(out, "    MARKER                 'MARKER'                 'INTEND'")?;
        }

        writeln!(out, "RHS")?;
        for row in self.rows.iter() {
            if row.rhs != 0.0 {
                writeln!(out, "    RHS  {}  {}", row.name, row.rhs)?;
            }
        }

        writeln!(out, "BOUNDS")?;
        for col in self.cols.iter() {
            if col.lb != 0.0 {
                writeln!(out, " LO BND  {}  {}", col.name, col.lb)?;
            }
            let kind = if col.integer { "UI" } else { "UP" };
            writeln!(out, " {} BND  {}  {}", kind, col.name, col.ub)?;
        }

        writeln!(out, "ENDATA")?;
        Ok(())
    }
}

/// Introspection of the model content, for tests.
#[cfg(test)]
impl Model {
    pub fn var(&self, name: &str) -> Option<Var> {
        self.cols.iter().position(|col| col.name == name).map(Var)
    }

    pub fn var_name(&self, var: Var) -> &str {
        &self.cols[var.0].name
    }

    pub fn bounds(&self, var: Var) -> (f64, f64) {
        (self.cols[var.0].lb, self.cols[var.0].ub)
    }

    pub fn is_integer(&self, var: Var) -> bool {
        self.cols[var.0].integer
    }

    pub fn objective_coeff(&self, var: Var) -> f64 {
        self.cols[var.0].obj
    }

    pub fn constraint(&self, name: &str) -> Option<(&[(Var, f64)], Sense, f64)> {
        self.rows
            .iter()
            .find(|row| row.name == name)
            .map(|row| (row.terms.as_slice(), row.sense, row.rhs))
    }

    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.name.as_str())
    }
}
