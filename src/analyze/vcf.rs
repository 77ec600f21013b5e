//! Parsing of annotated variant files into pharmacogene records.
//!
//! The input is a tab-separated VCF-like text.  Only the first three columns
//! (`CHROM`, `POS`, `ID`) and the eighth column (`INFO`) are interpreted.  The
//! `INFO` column must carry a `GENE` annotation and usually a `STAR` one.

use std::str::FromStr as _;

use itertools::Itertools as _;

use crate::common::Gene;

/// Marker that starts the column header line.
const HEADER_MARKER: &str = "#CHROM";

/// Minimal number of columns in a well-formed data row.
const MIN_COLUMNS: usize = 8;

/// Star allele used when the `STAR` annotation is missing.
pub const UNKNOWN_ALLELE: &str = "Unknown";

/// Structural problems that make a variant file unusable.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The input has no lines at all.
    #[error("empty file")]
    Empty,
    /// No `#CHROM` header line was found.
    #[error("missing header")]
    MissingHeader,
    /// There is not a single data row.
    #[error("no variant records")]
    NoRecords,
}

/// One retained variant in a target pharmacogene.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct VariantRecord {
    /// The annotated gene.
    pub gene: Gene,
    /// The dbSNP identifier, or `CHROM:POS` if none was given.
    pub rsid: String,
    /// The star allele, `Unknown` if none was given.
    pub star_allele: String,
}

/// Result of parsing a variant file.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Parsed {
    /// Records in target genes, in file order.
    pub records: Vec<VariantRecord>,
    /// Non-fatal annotation warnings, without duplicates.
    pub warnings: Vec<String>,
}

/// The annotations from the `INFO` column that we care about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Info<'a> {
    /// Value of `GENE`.
    pub gene: Option<&'a str>,
    /// Value of `STAR`.
    pub star: Option<&'a str>,
}

impl<'a> Info<'a> {
    /// Scan an `INFO` column.
    ///
    /// Entries are separated by `;` and split at the first `=`.  Entries
    /// without `=` are ignored, a repeated key overrides earlier values, and
    /// empty values are treated as absent.
    pub fn scan(field: &'a str) -> Self {
        let mut result = Self::default();
        for (key, value) in field.split(';').filter_map(|entry| entry.split_once('=')) {
            match key {
                "GENE" => result.gene = Some(value),
                "STAR" => result.star = Some(value),
                _ => (),
            }
        }
        result.gene = result.gene.filter(|value| !value.is_empty());
        result.star = result.star.filter(|value| !value.is_empty());
        result
    }
}

/// Parse the text of a variant file.
///
/// Lines may end in `\n`, `\r\n`, or a bare `\r`.
///
/// # Arguments
///
/// * `content` - The full file content.
///
/// # Returns
///
/// The records of target pharmacogenes together with deduplicated warnings
/// about missing annotations and malformed rows.
///
/// # Errors
///
/// Returns an [`Error`] if the file is empty, lacks the `#CHROM` header line,
/// or has no data rows at all.
pub fn parse(content: &str) -> Result<Parsed, Error> {
    if content.is_empty() {
        return Err(Error::Empty);
    }
    let lines = content.split(['\n', '\r']).collect::<Vec<_>>();
    if !lines.iter().any(|line| line.starts_with(HEADER_MARKER)) {
        return Err(Error::MissingHeader);
    }

    let mut records = Vec::new();
    let mut warnings = Vec::new();
    let mut data_rows = 0usize;
    let mut malformed_rows = 0usize;

    for line in lines {
        if line.trim().is_empty() || line.starts_with('#') {
            continue;
        }
        data_rows += 1;

        let columns = line.split('\t').collect::<Vec<_>>();
        if columns.len() < MIN_COLUMNS {
            tracing::debug!("malformed row with {} columns: {:?}", columns.len(), line);
            malformed_rows += 1;
            continue;
        }
        let (chrom, pos, rsid) = (columns[0], columns[1], columns[2]);
        let info = Info::scan(columns[7]);

        let Some(gene) = info.gene else {
            warnings.push(String::from(
                "One or more variants are missing GENE annotation and were skipped.",
            ));
            continue;
        };
        let star_allele = match info.star {
            Some(star) => star.to_string(),
            None => {
                warnings.push(format!(
                    "STAR annotation missing for {}; defaulted to {}.",
                    gene, UNKNOWN_ALLELE
                ));
                UNKNOWN_ALLELE.to_string()
            }
        };
        let rsid = if rsid.is_empty() || rsid == "." {
            warnings.push(String::from(
                "One or more variants were missing RSID and were labeled using CHROM:POS.",
            ));
            format!("{}:{}", chrom, pos)
        } else {
            rsid.to_string()
        };

        match Gene::from_str(gene) {
            Ok(gene) => records.push(VariantRecord {
                gene,
                rsid,
                star_allele,
            }),
            Err(_) => tracing::trace!("dropping variant in non-target gene {}", gene),
        }
    }

    if data_rows == 0 {
        return Err(Error::NoRecords);
    }
    if malformed_rows > 0 {
        warnings.push(format!(
            "{} malformed variant record(s) were skipped.",
            malformed_rows
        ));
    }

    tracing::debug!(
        "parsed {} data rows into {} records ({} malformed)",
        data_rows,
        records.len(),
        malformed_rows
    );

    Ok(Parsed {
        records,
        warnings: warnings.into_iter().unique().collect(),
    })
}

#[cfg(test)]
mod test {
    use crate::common::Gene;

    use super::{parse, Error, Info, VariantRecord};

    const HEADER: &str = "#CHROM\tPOS\tID\tREF\tALT\tQUAL\tFILTER\tINFO";

    fn vcf(rows: &[&str]) -> String {
        let mut lines = vec!["##fileformat=VCFv4.2", HEADER];
        lines.extend_from_slice(rows);
        lines.join("\n")
    }

    #[rstest::rstest]
    #[case("GENE=CYP2D6;STAR=*4", Some("CYP2D6"), Some("*4"))]
    #[case("DP=10;GENE=TPMT", Some("TPMT"), None)]
    #[case("GENE=;STAR=*2", None, Some("*2"))]
    #[case("SOMATIC;STAR=*3;GENE=DPYD", Some("DPYD"), Some("*3"))]
    #[case("GENE=CYP2C9;GENE=CYP2C19", Some("CYP2C19"), None)]
    #[case("STAR=a=b", None, Some("a=b"))]
    #[case(".", None, None)]
    fn info_scan(
        #[case] field: &str,
        #[case] gene: Option<&str>,
        #[case] star: Option<&str>,
    ) {
        assert_eq!(Info::scan(field), Info { gene, star });
    }

    #[test]
    fn parse_empty() {
        assert_eq!(parse(""), Err(Error::Empty));
    }

    #[rstest::rstest]
    #[case("chr22\t100\trs1\tA\tG\t.\t.\tGENE=CYP2D6;STAR=*4")]
    #[case("##fileformat=VCFv4.2\n#CHR\tPOS\n")]
    #[case("\n")]
    fn parse_missing_header(#[case] content: &str) {
        assert_eq!(parse(content), Err(Error::MissingHeader));
    }

    #[test]
    fn parse_header_anywhere() -> Result<(), anyhow::Error> {
        let content = format!("chr22\t100\trs1\tA\tG\t.\t.\tGENE=CYP2D6;STAR=*4\n{}", HEADER);
        let parsed = parse(&content)?;
        assert_eq!(parsed.records.len(), 1);

        Ok(())
    }

    #[test]
    fn parse_no_records() {
        assert_eq!(parse(&vcf(&["", "  "])), Err(Error::NoRecords));
    }

    #[test]
    fn parse_only_malformed_rows_is_not_fatal() -> Result<(), anyhow::Error> {
        let parsed = parse(&vcf(&["chr22\t100\trs1", "chr22\t200"]))?;

        assert!(parsed.records.is_empty());
        assert_eq!(
            parsed.warnings,
            vec![String::from("2 malformed variant record(s) were skipped.")]
        );

        Ok(())
    }

    #[tracing_test::traced_test]
    #[test]
    fn parse_single_record() -> Result<(), anyhow::Error> {
        let parsed = parse(&vcf(&["chr22\t100\trs3892097\tA\tG\t.\tPASS\tGENE=CYP2D6;STAR=*4"]))?;

        assert_eq!(
            parsed.records,
            vec![VariantRecord {
                gene: Gene::Cyp2d6,
                rsid: String::from("rs3892097"),
                star_allele: String::from("*4"),
            }]
        );
        assert!(parsed.warnings.is_empty());
        assert!(logs_contain("parsed 1 data rows into 1 records (0 malformed)"));

        Ok(())
    }

    #[test]
    fn parse_drops_non_target_genes_silently() -> Result<(), anyhow::Error> {
        let parsed = parse(&vcf(&[
            "chr17\t100\trs1\tA\tG\t.\t.\tGENE=BRCA1;STAR=*1",
            "chr10\t200\trs2\tA\tG\t.\t.\tGENE=CYP2C19;STAR=*2",
        ]))?;

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].gene, Gene::Cyp2c19);
        assert!(parsed.warnings.is_empty());

        Ok(())
    }

    #[test]
    fn parse_defaults_and_warnings() -> Result<(), anyhow::Error> {
        let parsed = parse(&vcf(&[
            "chr22\t100\t.\tA\tG\t.\t.\tGENE=CYP2D6",
            "chr22\t200\t\tA\tG\t.\t.\tGENE=CYP2D6;STAR=*2",
            "chr22\t300\trs5\tA\tG\t.\t.\tSTAR=*2",
            "chr22\t400\trs6\tA\tG\t.\t.\tSTAR=*3",
            "chr22\t500",
        ]))?;

        assert_eq!(
            parsed.records,
            vec![
                VariantRecord {
                    gene: Gene::Cyp2d6,
                    rsid: String::from("chr22:100"),
                    star_allele: String::from("Unknown"),
                },
                VariantRecord {
                    gene: Gene::Cyp2d6,
                    rsid: String::from("chr22:200"),
                    star_allele: String::from("*2"),
                },
            ]
        );
        insta::assert_yaml_snapshot!(parsed.warnings);

        Ok(())
    }

    #[test]
    fn parse_warnings_are_unique() -> Result<(), anyhow::Error> {
        let rows = (0..10)
            .map(|i| format!("chr22\t{}\t.\tA\tG\t.\t.\tGENE=TPMT", i))
            .chain((0..3).map(|i| format!("chr22\t{}\t.\tA\tG\t.\t.\tDP=3", i)))
            .collect::<Vec<_>>();
        let rows = rows.iter().map(String::as_str).collect::<Vec<_>>();

        let parsed = parse(&vcf(&rows))?;

        assert_eq!(parsed.records.len(), 10);
        assert_eq!(
            parsed.warnings,
            vec![
                String::from("STAR annotation missing for TPMT; defaulted to Unknown."),
                String::from(
                    "One or more variants were missing RSID and were labeled using CHROM:POS."
                ),
                String::from("One or more variants are missing GENE annotation and were skipped."),
            ]
        );

        Ok(())
    }

    #[test]
    fn parse_crlf_line_endings() -> Result<(), anyhow::Error> {
        let content = format!(
            "{}\r\nchr10\t100\trs4244285\tG\tA\t.\t.\tGENE=CYP2C19;STAR=*2\r\n",
            HEADER
        );
        let parsed = parse(&content)?;

        assert_eq!(parsed.records[0].star_allele, "*2");

        Ok(())
    }

    #[test]
    fn parse_bare_cr_line_endings() -> Result<(), anyhow::Error> {
        let content = format!(
            "##fileformat=VCFv4.2\r{}\rchr22\t100\trs1\tA\tG\t.\t.\tGENE=CYP2D6;STAR=*4\r",
            HEADER
        );
        let parsed = parse(&content)?;

        assert_eq!(parsed.records.len(), 1);
        assert_eq!(parsed.records[0].gene, Gene::Cyp2d6);
        assert_eq!(parsed.records[0].star_allele, "*4");
        assert!(parsed.warnings.is_empty());

        Ok(())
    }
}
