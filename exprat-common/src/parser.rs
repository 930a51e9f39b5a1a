//! QDIMACS and expansion CNF parser

use crate::{
    expansion::Expansion,
    formula::{Qbf, QuantifierKind},
    input::Input,
    literal::{Literal, Variable},
    memory::Stack,
    output::unreachable,
};
use std::{
    fs::File,
    io::{BufReader, Read, Result, StdinLock},
};

/// Parser error ("expected ...")
pub const MAPPING_LISTS: &str = "expansion and QBF variable lists must be of the same size";

/// Open a file for reading.
/// # Panics
/// Panics on error.
pub fn open_file(filename: &str) -> File {
    File::open(filename).unwrap_or_else(|err| die!("cannot open file: {}", err))
}

/// File extension of Zstandard archives.
const ZSTD: &str = ".zst";
/// File extension of Gzip archives.
const GZIP: &str = ".gz";
/// File extension of Bzip2 archives.
const BZIP2: &str = ".bz2";
/// File extension of XZ archives.
const XZ: &str = ".xz";
/// File extension of LZ4 archives.
const LZ4: &str = ".lz4";

/// Strip the compression format off a filename.
///
/// If the filename ends with a known archive extension,
/// return the filename without extension and the extension.
/// Otherwise return the unmodified filename and the empty string.
fn compression_format_by_extension(filename: &str) -> (&str, &str) {
    let mut basename = filename;
    let mut compression_format = "";
    for extension in &[ZSTD, GZIP, BZIP2, LZ4, XZ] {
        if filename.ends_with(extension) {
            compression_format = extension;
            basename = &filename[0..filename.len() - extension.len()];
            break;
        }
    }
    (basename, compression_format)
}

/// Return an [Input](../input/struct.Input.html) to read from a possibly
/// compressed file.
///
/// If the file is compressed it is transparently uncompressed.
/// If the filename is "-", returns an [Input](../input/struct.Input.html)
/// reading data from stdin.
pub fn read_compressed_file_or_stdin<'a>(filename: &'a str, stdin: StdinLock<'a>) -> Input<'a> {
    match filename {
        "-" => Input::new(Box::new(stdin.bytes().map(panic_on_error))),
        filename => read_compressed_file(filename),
    }
}

/// Return an [Input](../input/struct.Input.html) to read from a possibly
/// compressed file.
///
/// If the file is compressed it is transparently uncompressed.
pub fn read_compressed_file(filename: &str) -> Input {
    let file = open_file(filename);
    Input::new(read_from_compressed_file(file, filename))
}

/// Return an Iterator to read from a possibly compressed file.
///
/// If the file is compressed it is transparently uncompressed.
fn read_from_compressed_file(file: File, filename: &str) -> Box<dyn Iterator<Item = u8>> {
    let (_basename, compression_format) = compression_format_by_extension(filename);
    if compression_format == "" {
        return Box::new(BufReader::new(file).bytes().map(panic_on_error));
    }
    match compression_format {
        ZSTD => {
            let de = zstd::stream::read::Decoder::new(file)
                .unwrap_or_else(|err| die!("failed to decompress ZST archive: {}", err));
            Box::new(de.bytes().map(panic_on_error))
        }
        GZIP => {
            let de = flate2::read::GzDecoder::new(file);
            Box::new(de.bytes().map(panic_on_error))
        }
        BZIP2 => {
            let de = bzip2::read::BzDecoder::new(file);
            Box::new(de.bytes().map(panic_on_error))
        }
        XZ => {
            let de = xz2::read::XzDecoder::new(file);
            Box::new(de.bytes().map(panic_on_error))
        }
        LZ4 => {
            let de = lz4::Decoder::new(file)
                .unwrap_or_else(|err| die!("failed to decode LZ4 archive: {}", err));
            Box::new(de.bytes().map(panic_on_error))
        }
        _ => unreachable(),
    }
}

/// Unwraps a result, panicking on error.
pub fn panic_on_error<T>(result: Result<T>) -> T {
    result.unwrap_or_else(|error| die!("{}", error))
}

/// Consume one word, stopping before the next space or linebreak.
fn parse_word(input: &mut Input) -> String {
    input.skip_blanks();
    let mut word = String::new();
    while let Some(c) = input.peek() {
        if Input::is_space(c) {
            break;
        }
        word.push(char::from(c));
        input.next();
    }
    word
}

/// Parse a variable, rejecting a leading dash.
///
/// Returns variable zero for a literal `0`, which terminates a list.
fn parse_variable(input: &mut Input) -> Result<Variable> {
    input.skip_blanks();
    if input.peek() == Some(b'-') {
        return Err(input.error(Input::POSITIVE_NUMBER));
    }
    let value = input.parse_dec32()?;
    Ok(Variable::new(value as u32))
}

/// Parse a list of variables, terminated by `0`, a linebreak, or EOF.
///
/// The terminating `0` is not part of the result. A list that runs into
/// the end of the line without one is accepted with a warning.
fn parse_variable_list(input: &mut Input) -> Result<Stack<Variable>> {
    let mut variables = Stack::new();
    loop {
        input.skip_blanks();
        match input.peek() {
            None | Some(b'\n') => {
                let (line, column) = input.location();
                warn!("Expected '0' delimiter at line {} column {}", line, column);
                break;
            }
            Some(_) => (),
        }
        let variable = parse_variable(input)?;
        if variable == Variable::new(0) {
            break;
        }
        variables.push(variable);
    }
    Ok(variables)
}

/// Parse a list of literals, terminated by `0`, a linebreak, or EOF.
///
/// The terminating `0` is not part of the result. A list that runs into
/// the end of the line without one is accepted with a warning.
fn parse_literal_list(input: &mut Input) -> Result<Stack<Literal>> {
    let mut literals = Stack::new();
    loop {
        input.skip_blanks();
        match input.peek() {
            None | Some(b'\n') => {
                let (line, column) = input.location();
                warn!("Expected '0' delimiter at line {} column {}", line, column);
                break;
            }
            Some(_) => (),
        }
        let literal = Literal::new(input.parse_dec32()?);
        if literal == Literal::new(0) {
            break;
        }
        literals.push(literal);
    }
    Ok(literals)
}

/// Parse a `p cnf <max-variable> <clauses>` header line. The `p` has
/// already been seen but not consumed.
///
/// An optional trailing `0` is tolerated, any other trailing number is
/// rejected.
fn parse_header(input: &mut Input) -> Result<(u32, u64)> {
    invariant!(input.peek() == Some(b'p'));
    input.next();
    if parse_word(input) != "cnf" {
        return Err(input.error(Input::P_CNF));
    }
    input.skip_blanks();
    if input.peek() == Some(b'-') {
        return Err(input.error(Input::POSITIVE_NUMBER));
    }
    let max_variable = input.parse_dec32()?;
    input.skip_blanks();
    if input.peek() == Some(b'-') {
        return Err(input.error(Input::POSITIVE_NUMBER));
    }
    let clauses = input.parse_dec64()?;
    input.skip_blanks();
    if let Some(c) = input.peek() {
        if Input::is_digit_or_dash(c) && input.parse_dec64()? != 0 {
            return Err(input.error(Input::UNEXPECTED_CHARACTER));
        }
    }
    Ok((max_variable as u32, clauses as u64))
}

/// Parse a QBF in QDIMACS format.
///
/// The dispatch is line-based: `p` starts the header, `c` a comment,
/// `a` and `e` a quantifier block, and a digit or dash a matrix clause.
pub fn parse_qbf(input: &mut Input) -> Result<Qbf> {
    let mut qbf = Qbf::new();
    let mut parsed_header = false;
    let mut declared_max_variable = 0;
    let mut declared_clauses = 0;
    loop {
        input.skip_any_whitespace();
        match input.peek() {
            None => break,
            Some(b'c') => input.skip_to_end_of_line(),
            Some(b'p') => {
                if parsed_header {
                    return Err(input.error(Input::DUPLICATE_HEADER));
                }
                let (max_variable, clauses) = parse_header(input)?;
                declared_max_variable = max_variable;
                declared_clauses = clauses;
                parsed_header = true;
            }
            Some(b'a') => {
                input.next();
                let variables = parse_variable_list(input)?;
                qbf.add_quantifier(QuantifierKind::Universal, variables);
            }
            Some(b'e') => {
                input.next();
                let variables = parse_variable_list(input)?;
                qbf.add_quantifier(QuantifierKind::Existential, variables);
            }
            Some(c) if Input::is_digit_or_dash(c) => {
                let literals = parse_literal_list(input)?;
                qbf.add_clause(literals);
            }
            Some(_) => return Err(input.error(Input::UNEXPECTED_CHARACTER)),
        }
    }
    if !parsed_header {
        return Err(input.error(Input::MISSING_HEADER));
    }
    if qbf.matrix.len() as u64 != declared_clauses {
        warn!(
            "Expected {} clause[s], but received {}",
            declared_clauses,
            qbf.matrix.len()
        );
    }
    if qbf.max_variable != Variable::new(declared_max_variable) {
        warn!(
            "Expected maximum variable to be {}, but maximum variable is actually {} \
             in quantifiers and clauses",
            declared_max_variable, qbf.max_variable
        );
        if Variable::new(declared_max_variable) > qbf.max_variable {
            qbf.max_variable = Variable::new(declared_max_variable);
        }
    }
    Ok(qbf)
}

/// Parse the `c x <exp-vars> 0 <qbf-vars> 0 <annotation> 0` mapping
/// comment body. Each pair of variables becomes one mapping, all pairs of
/// the line share the annotation.
fn parse_mapping_comment(input: &mut Input, expansion: &mut Expansion) -> Result<()> {
    let exp_variables = parse_variable_list(input)?;
    let qbf_variables = parse_variable_list(input)?;
    if exp_variables.len() != qbf_variables.len() {
        return Err(input.error(MAPPING_LISTS));
    }
    let annotation = parse_literal_list(input)?;
    for offset in 0..exp_variables.len() {
        expansion.add_mapping(
            exp_variables[offset],
            qbf_variables[offset],
            annotation.clone(),
        );
    }
    Ok(())
}

/// Parse the `c o <origins> 0` comment body. Origins are one-indexed in
/// the file and stored zero-indexed.
fn parse_origin_comment(input: &mut Input, origins: &mut Stack<usize>) -> Result<()> {
    loop {
        input.skip_blanks();
        match input.peek() {
            None | Some(b'\n') => {
                let (line, column) = input.location();
                warn!("Expected '0' delimiter at line {} column {}", line, column);
                break;
            }
            Some(_) => (),
        }
        input.skip_blanks();
        if input.peek() == Some(b'-') {
            return Err(input.error(Input::POSITIVE_NUMBER));
        }
        let origin = input.parse_dec64()?;
        if origin == 0 {
            break;
        }
        origins.push(origin as usize - 1);
    }
    Ok(())
}

/// Parse a CNF expansion in DIMACS format with mapping comments.
///
/// Besides the header and the clauses there are three kinds of comments:
/// `c x` declares variable mappings, `c o` declares clause origins, and
/// anything else is skipped. A missing `c o` comment drops into
/// exhaustive search mode.
pub fn parse_expansion(input: &mut Input) -> Result<Expansion> {
    let mut expansion = Expansion::new();
    let mut parsed_header = false;
    let mut parsed_origins = false;
    let mut origins = Stack::new();
    let mut declared_max_variable = 0;
    loop {
        input.skip_any_whitespace();
        match input.peek() {
            None => break,
            Some(b'c') => {
                input.next();
                match parse_word(input).as_str() {
                    "x" => parse_mapping_comment(input, &mut expansion)?,
                    "o" => {
                        parse_origin_comment(input, &mut origins)?;
                        parsed_origins = true;
                    }
                    _ => input.skip_to_end_of_line(),
                }
            }
            Some(b'p') => {
                if parsed_header {
                    return Err(input.error(Input::DUPLICATE_HEADER));
                }
                let (max_variable, clauses) = parse_header(input)?;
                declared_max_variable = max_variable;
                expansion.declared_clauses = clauses;
                parsed_header = true;
            }
            Some(c) if Input::is_digit_or_dash(c) => {
                let literals = parse_literal_list(input)?;
                expansion.add_clause(literals);
            }
            Some(_) => return Err(input.error(Input::UNEXPECTED_CHARACTER)),
        }
    }
    if parsed_origins {
        expansion.clause_origins = Some(origins);
    } else {
        warn!(
            "No clause origin mapping comment ('c o 1 4 2 2 ... 0') found. \
             Falling back to iterative search mode, this might be quite slow."
        );
    }
    if !parsed_header {
        return Err(input.error(Input::MISSING_HEADER));
    }
    if expansion.clauses.len() as u64 != expansion.declared_clauses {
        warn!(
            "Expected {} clause[s], but received {}",
            expansion.declared_clauses,
            expansion.clauses.len()
        );
    }
    if expansion.max_variable != Variable::new(declared_max_variable) {
        warn!(
            "Expected maximum variable to be {}, but maximum variable is actually {} \
             in the expansion mapping comments",
            declared_max_variable, expansion.max_variable
        );
        if Variable::new(declared_max_variable) > expansion.max_variable {
            expansion.max_variable = Variable::new(declared_max_variable);
        }
    }
    Ok(expansion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formula::QuantifierKind;

    fn input(text: &str) -> Input {
        Input::new(Box::new(text.as_bytes().iter().cloned()))
    }

    fn sample_qbf() -> &'static str {
        r#"c a sample QDIMACS formula
p cnf 4 2
a 1 0
e 2 3 0
a 4 0
1 -2 0
-1 3 -4 0
"#
    }

    #[test]
    fn parses_header_prefix_and_matrix() {
        let qbf = parse_qbf(&mut input(sample_qbf())).unwrap();
        assert_eq!(qbf.max_variable, Variable::new(4));
        assert_eq!(qbf.alternations, 2);
        assert_eq!(qbf.prefix.len(), 3);
        assert_eq!(qbf.prefix[1].kind, QuantifierKind::Existential);
        assert_eq!(
            qbf.prefix[1].variables.as_slice(),
            &[Variable::new(2), Variable::new(3)]
        );
        assert_eq!(qbf.matrix.len(), 2);
        assert_eq!(
            qbf.matrix[1].literals.as_slice(),
            &[Literal::new(-1), Literal::new(3), Literal::new(-4)]
        );
    }

    #[test]
    fn header_must_be_present() {
        assert!(parse_qbf(&mut input("e 1 0\n1 0\n")).is_err());
        assert!(parse_expansion(&mut input("1 0\n")).is_err());
    }

    #[test]
    fn header_must_be_unique() {
        assert!(parse_qbf(&mut input("p cnf 1 1\np cnf 1 1\n1 0\n")).is_err());
    }

    #[test]
    fn header_must_declare_cnf() {
        assert!(parse_qbf(&mut input("p wcnf 1 1\n1 0\n")).is_err());
    }

    #[test]
    fn header_rejects_a_trailing_number() {
        assert!(parse_qbf(&mut input("p cnf 1 1 7\n1 0\n")).is_err());
        // A trailing terminator is fine.
        assert!(parse_qbf(&mut input("p cnf 1 1 0\n1 0\n")).is_ok());
    }

    #[test]
    fn negative_variables_are_rejected_in_the_prefix() {
        assert!(parse_qbf(&mut input("p cnf 2 1\ne 1 -2 0\n1 0\n")).is_err());
    }

    #[test]
    fn lists_may_end_at_the_linebreak() {
        let qbf = parse_qbf(&mut input("p cnf 2 1\ne 1 2\n1 2\n")).unwrap();
        assert_eq!(qbf.prefix[0].variables.len(), 2);
        assert_eq!(qbf.matrix[0].len(), 2);
    }

    #[test]
    fn declared_max_variable_wins_if_bigger() {
        let qbf = parse_qbf(&mut input("p cnf 9 1\ne 1 0\n1 0\n")).unwrap();
        assert_eq!(qbf.max_variable, Variable::new(9));
        let qbf = parse_qbf(&mut input("p cnf 1 1\ne 1 2 0\n1 2 0\n")).unwrap();
        assert_eq!(qbf.max_variable, Variable::new(2));
    }

    fn sample_expansion() -> &'static str {
        r#"c some free-form comment
c x 1 2 0 2 3 0 -1 0
c x 3 0 4 0 1 0
c o 1 2 0
p cnf 3 2
1 2 0
3 0
"#
    }

    #[test]
    fn parses_mappings_origins_and_clauses() {
        let expansion = parse_expansion(&mut input(sample_expansion())).unwrap();
        assert_eq!(expansion.max_variable, Variable::new(3));
        assert_eq!(expansion.declared_clauses, 2);
        assert_eq!(expansion.clauses.len(), 2);
        let mapping = expansion.mapping(Variable::new(2)).unwrap();
        assert_eq!(mapping.qbf_var, Variable::new(3));
        assert_eq!(mapping.annotation.as_slice(), &[Literal::new(-1)]);
        // Pairs of one mapping comment share the annotation.
        let sibling = expansion.mapping(Variable::new(1)).unwrap();
        assert_eq!(sibling.qbf_var, Variable::new(2));
        assert_eq!(sibling.annotation.as_slice(), &[Literal::new(-1)]);
        assert!(expansion.mapping(Variable::new(4)).is_none());
    }

    #[test]
    fn origins_are_stored_zero_indexed() {
        let expansion = parse_expansion(&mut input(sample_expansion())).unwrap();
        let origins = expansion.clause_origins.as_ref().unwrap();
        assert_eq!(origins.as_slice(), &[0, 1]);
    }

    #[test]
    fn missing_origin_comment_means_exhaustive_search() {
        let expansion =
            parse_expansion(&mut input("c x 1 0 1 0 0\np cnf 1 1\n1 0\n")).unwrap();
        assert!(expansion.clause_origins.is_none());
    }

    #[test]
    fn empty_origin_comment_still_counts() {
        let expansion =
            parse_expansion(&mut input("c x 1 0 1 0 0\nc o 0\np cnf 1 1\n1 0\n")).unwrap();
        assert_eq!(expansion.clause_origins.as_ref().unwrap().len(), 0);
    }

    #[test]
    fn mapping_lists_must_have_equal_length() {
        assert!(parse_expansion(&mut input("c x 1 2 0 3 0 0\np cnf 2 0\n")).is_err());
    }

    #[test]
    fn unknown_comment_words_are_skipped() {
        let expansion =
            parse_expansion(&mut input("c xyzzy 1 2 3\nc o 1 0\np cnf 1 1\n1 0\n")).unwrap();
        assert_eq!(expansion.clauses.len(), 1);
    }
}
