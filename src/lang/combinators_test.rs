use super::combinators::*;
use nom::character::complete::digit1;
use nom::sequence::terminated;
use nom::combinator::map;

fn number<'a>(input: Span<'a>) -> PResult<'a,i64> {
    let res: PResult<'a,Span<'a>> = terminated(digit1,nom::character::complete::space0)(input);
    let (rest,digits) = res?;
    Ok((rest,digits.fragment().parse::<i64>().unwrap_or(0)))
}

#[derive(Debug,PartialEq)]
enum Tree {
    Leaf(i64),
    Sum(Box<Tree>,Box<Tree>)
}

fn sum<'a>(input: Span<'a>) -> PResult<'a,Tree> {
    left_chain(map(number,Tree::Leaf),symbol("+"),|l,_,r| Tree::Sum(Box::new(l),Box::new(r)))(input)
}

mod positions {
    use super::*;
    #[test]
    fn start_and_end() {
        let res = parse_text(positioned(keyword("CALL")),"CALL  FOO").expect("parse failed");
        assert_eq!(res.start,Position::new(1,1));
        // trailing space belongs to the keyword
        assert_eq!(res.end,Position::new(1,7));
        assert!(res.start <= res.end);
    }
    #[test]
    fn end_on_later_line() {
        let text = "\n\n  12 ";
        let mut p = positioned(nom::sequence::preceded(nom::character::complete::multispace0,number));
        let (rest,res) = p(Span::new(text)).expect("parse failed");
        assert_eq!(res.value,12);
        assert_eq!(res.start,Position::new(1,1));
        assert_eq!(res.end,Position::of(&rest));
        assert_eq!(res.end,Position::new(3,6));
    }
    #[test]
    fn lsp_conversion() {
        let pos = Position::new(3,5);
        assert_eq!(pos.to_lsp(),lsp_types::Position::new(2,4));
    }
    #[test]
    fn ordering() {
        assert!(Position::new(1,20) < Position::new(2,1));
        assert!(Position::new(2,3) < Position::new(2,4));
    }
}

mod keywords {
    use super::*;
    #[test]
    fn case_insensitive() {
        assert!(parse_text(keyword("ENDIF"),"endif").is_ok());
        assert!(parse_text(keyword("ENDIF"),"EndIf").is_ok());
    }
    #[test]
    fn word_boundary() {
        let mut p = keyword("END");
        assert!(p(Span::new("ENDIF")).is_err());
        assert!(p(Span::new("END ;")).is_ok());
    }
    #[test]
    fn expectation_reported() {
        let err = parse_text(keyword("CALL"),"JMP").expect_err("should fail");
        assert_eq!(err.position,Position::new(1,1));
        assert_eq!(err.expected,vec!["CALL".to_string()]);
    }
    #[test]
    fn end_of_input_message() {
        let err = parse_text(nom::sequence::pair(keyword("CALL"),identifier),"CALL ").expect_err("should fail");
        assert_eq!(err.message,"unexpected end of input");
        assert_eq!(err.position,Position::new(1,6));
    }
    #[test]
    fn real_failure_not_masked() {
        let err = parse_text(nom::sequence::pair(keyword("CALL"),identifier),"CALL 9").expect_err("should fail");
        assert_eq!(err.position,Position::new(1,6));
        assert_ne!(err.message,"unexpected end of input");
    }
}

mod delimiters {
    use super::*;
    #[test]
    fn brackets() {
        let (rest,n) = between_brackets(number)(Span::new("[ 5 ] x")).expect("parse failed");
        assert_eq!(n,5);
        assert_eq!(*rest.fragment(),"x");
    }
    #[test]
    fn parens_and_braces() {
        assert_eq!(parse_text(between_parens(number),"(7)").expect("parse failed"),7);
        assert_eq!(parse_text(between_braces(number),"{ 8 }").expect("parse failed"),8);
    }
    #[test]
    fn unbalanced() {
        assert!(parse_text(between_parens(number),"(7").is_err());
    }
}

mod chains {
    use super::*;
    #[test]
    fn single_operand_collapses() {
        let tree = parse_text(sum,"4").expect("parse failed");
        assert_eq!(tree,Tree::Leaf(4));
    }
    #[test]
    fn left_associative() {
        let tree = parse_text(sum,"1 + 2 + 3").expect("parse failed");
        let expected = Tree::Sum(
            Box::new(Tree::Sum(Box::new(Tree::Leaf(1)),Box::new(Tree::Leaf(2)))),
            Box::new(Tree::Leaf(3))
        );
        assert_eq!(tree,expected);
    }
    #[test]
    fn dangling_operator() {
        let (rest,_) = sum(Span::new("1 + 2")).expect("parse failed");
        assert_eq!(*rest.fragment(),"");
        assert!(sum(Span::new("1 + ")).is_err());
    }
}
