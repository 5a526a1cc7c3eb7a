//! Human readable comparison report

use super::{filenames_print, ComparisonResult};
use std::io::{self, Write};

/// Renders a [`ComparisonResult`] for terminal output
pub struct ComparisonReport<'a> {
	result: &'a ComparisonResult,
	base_name: &'a str,
	other_name: &'a str,
	color: bool,
}

impl<'a> ComparisonReport<'a> {
	pub fn new(result: &'a ComparisonResult, base_name: &'a str, other_name: &'a str) -> Self {
		Self { result, base_name, other_name, color: false }
	}

	/// Highlight differing path parts with ANSI colors
	pub fn with_color(mut self, color: bool) -> Self {
		self.color = color;
		self
	}

	/// Extras of both sides, relocations, then stats
	pub fn write_all(&self, out: &mut dyn Write) -> io::Result<()> {
		self.write_extras(out, self.base_name, &self.result.unmatched_base_extras)?;
		self.write_extras(out, self.other_name, &self.result.unmatched_other_extras)?;
		self.write_relocations(out)?;
		self.write_stats(out)
	}

	fn write_extras(
		&self,
		out: &mut dyn Write,
		name: &str,
		extras: &[super::ExtraGroup],
	) -> io::Result<()> {
		if extras.is_empty() {
			return Ok(());
		}
		writeln!(out)?;
		writeln!(out, "Extra files in {} archive:", name)?;
		for group in extras {
			writeln!(out, "\t{}", filenames_print(&group.filenames))?;
		}
		Ok(())
	}

	fn write_relocations(&self, out: &mut dyn Write) -> io::Result<()> {
		if self.result.relocations.is_empty() {
			return Ok(());
		}
		writeln!(out)?;
		writeln!(out, "Files to be moved in {} to match {}:", self.other_name, self.base_name)?;
		for r in &self.result.relocations {
			let (from, to) = (r.extra_other_locations(), r.extra_base_locations());
			if from.len() == 1 && to.len() == 1 {
				let highlight = |s: &str| {
					if self.color {
						format!("\u{1b}[31m{}\u{1b}[0m", s)
					} else {
						s.to_string()
					}
				};
				writeln!(out, "\t{}", path_diff(&from[0], &to[0], highlight))?;
			} else {
				writeln!(out, "\t{} -> {}", filenames_print(from), filenames_print(to))?;
			}
		}
		Ok(())
	}

	pub fn write_stats(&self, out: &mut dyn Write) -> io::Result<()> {
		let result = self.result;
		writeln!(out)?;
		writeln!(out, "Extra files in {} archive: {}", self.base_name, result.missing_base_in_other())?;
		writeln!(out, "Extra files in {} archive: {}", self.other_name, result.missing_other_in_base())?;
		writeln!(
			out,
			"Total files present in both archives: {}",
			result.all_base_files.len() - result.missing_base_in_other()
		)?;
		writeln!(out)
	}
}

/// Render a move as `common/{old => new}/common`, component-wise.
///
/// `highlight` decorates the differing parts.
pub fn path_diff<F>(from: &str, to: &str, highlight: F) -> String
where
	F: Fn(&str) -> String,
{
	let a: Vec<&str> = from.split('/').collect();
	let b: Vec<&str> = to.split('/').collect();

	let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
	let max_suffix = a.len().min(b.len()) - prefix;
	let suffix =
		a.iter().rev().zip(b.iter().rev()).take(max_suffix).take_while(|(x, y)| x == y).count();

	if prefix == 0 && suffix == 0 {
		return format!("{} -> {}", highlight(from), highlight(to));
	}

	let mut out = String::new();
	if prefix > 0 {
		out.push_str(&a[..prefix].join("/"));
		out.push('/');
	}
	out.push_str(&format!(
		"{{{} => {}}}",
		highlight(&a[prefix..a.len() - suffix].join("/")),
		highlight(&b[prefix..b.len() - suffix].join("/"))
	));
	if suffix > 0 {
		out.push('/');
		out.push_str(&a[a.len() - suffix..].join("/"));
	}
	out
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::compare::compare;
	use crate::types::{Checksum, FileEntry, RepoIndex};

	fn plain(s: &str) -> String {
		s.to_string()
	}

	#[test]
	fn test_path_diff() {
		assert_eq!(path_diff("old/a", "new/a", plain), "{old => new}/a");
		assert_eq!(path_diff("x/old/a", "x/a", plain), "x/{old => }/a");
		assert_eq!(path_diff("photos/2020/a.jpg", "photos/2021/a.jpg", plain), "photos/{2020 => 2021}/a.jpg");
		assert_eq!(path_diff("a", "b", plain), "a -> b");
	}

	#[test]
	fn test_report_text() {
		let entry = |p: &str, c: &[u8]| FileEntry::new(p, Some(c.len() as u64), Checksum::of(c));
		let base = RepoIndex::new(vec![entry("a", b"A"), entry("new", b"N")]);
		let other = RepoIndex::new(vec![entry("old/a", b"A"), entry("gone", b"G")]);
		let result = compare(&base, &other);

		let mut out = Vec::new();
		ComparisonReport::new(&result, "local", "remote").write_all(&mut out).unwrap();
		let text = String::from_utf8(out).unwrap();
		assert_eq!(
			text,
			"\nExtra files in local archive:\n\tnew\n\
			 \nExtra files in remote archive:\n\tgone\n\
			 \nFiles to be moved in remote to match local:\n\t{old => }/a\n\
			 \nExtra files in local archive: 1\n\
			 Extra files in remote archive: 1\n\
			 Total files present in both archives: 1\n\n"
		);
	}
}

// vim: ts=4
